//! Modify an existing lifecycle rule in place.
use clap::{App, Arg, ArgMatches, SubCommand};

use std::time::SystemTime;

use crate::cli::{self, Globals};
use crate::message::{print_msg, EditMessage, SUCCESS};
use crate::rule::merge::UnknownRule;
use crate::rule::validate::ensure_future_dates;
use crate::rule::{upsert_rule, validate, RuleOptions, TierPolicy, ValidationError};
use crate::store::{LifecycleStore, S3Store, Target};
use crate::types::{UtilError, UtilResult};

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("edit")
        .about("Modify a lifecycle configuration rule by ID")
        .arg(cli::target_arg())
        .args(&cli::rule_args())
        .arg(
            Arg::with_name("enable")
                .help("Enable a disabled rule")
                .long("enable")
                .conflicts_with("disable"),
        )
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(store: S3Store, args: &ArgMatches<'_>, globals: &Globals) -> UtilResult<()> {
    let target = cli::get_target(args)?;
    let opts = cli::rule_options(args);

    let msg = run(&store, &target, opts, &globals.policy, SystemTime::now()).await?;
    print_msg(&msg, globals.json, &globals.theme)
}

/// Applies the provided options on top of a stored rule.
///
/// Only options which were provided change the rule; the result must pass
/// validation again before anything is written back.
pub async fn run<S: LifecycleStore>(
    store: &S,
    target: &Target,
    opts: RuleOptions,
    policy: &TierPolicy,
    now: SystemTime,
) -> UtilResult<EditMessage> {
    let id = opts
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingId)?
        .to_string();

    let context = || format!("{} (rule `{}`)", target, id);

    info!("Fetching lifecycle configuration for {}...", target);

    let rules = store
        .fetch(target)
        .await
        .map_err(|err| UtilError::from(err).context(context()))?;

    let existing = rules
        .find(&id)
        .cloned()
        .ok_or_else(|| UnknownRule(id.clone()))
        .map_err(|err| UtilError::from(err).context(target))?;

    let edited = opts.apply_to(existing)?;
    validate(&edited, policy)?;

    // only freshly provided dates have to be in the future
    let mut fresh = edited.clone();
    if opts.expire_date.is_none() {
        if let Some(ref mut expiration) = fresh.expiration {
            expiration.date = None;
        }
    }
    if opts.transition_date.is_none() {
        if let Some(ref mut transition) = fresh.transition {
            transition.date = None;
        }
    }
    ensure_future_dates(&fresh, now)?;

    let rules = upsert_rule(rules, edited);

    info!("Storing {} lifecycle rule(s) for {}...", rules.rules.len(), target);

    store
        .replace(target, &rules)
        .await
        .map_err(|err| UtilError::from(err).context(context()))?;

    Ok(EditMessage {
        status: SUCCESS,
        target: target.to_string(),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{build_rule, RuleSet, Status};
    use crate::store::memory::MemoryStore;
    use crate::types::ErrorKind;

    fn target() -> Target {
        Target::parse("bucket").unwrap()
    }

    fn now() -> SystemTime {
        humantime::parse_rfc3339("2025-01-01T00:00:00Z").unwrap()
    }

    fn edit(id: &str) -> RuleOptions {
        RuleOptions {
            id: Some(id.into()),
            ..RuleOptions::default()
        }
    }

    fn store() -> MemoryStore {
        let rule = |id: &str| {
            build_rule(&RuleOptions {
                prefix: Some(format!("{}/", id)),
                tags: Some("team=ops".into()),
                expire_date: Some("2024-01-01".into()),
                ..edit(id)
            })
            .unwrap()
        };
        MemoryStore::with("bucket", RuleSet::new(vec![rule("a"), rule("b")]))
    }

    #[tokio::test]
    async fn editing_only_provided_fields() {
        let store = store();
        let opts = RuleOptions {
            transition_days: Some("30".into()),
            transition_tier: Some("cold".into()),
            status: Some(Status::Disabled),
            ..edit("b")
        };

        run(&store, &target(), opts, &TierPolicy::default(), now())
            .await
            .unwrap();

        let rules = store.get("bucket").unwrap();
        let rule = &rules.rules[1];

        assert_eq!(rule.id, "b");
        assert_eq!(rule.prefix(), "b/");
        assert_eq!(rule.tags().len(), 1);
        assert_eq!(rule.status, Status::Disabled);
        assert_eq!(rule.transition.as_ref().unwrap().storage_class, "COLD");

        // the stale expiry date is untouched, and not re-checked
        assert_eq!(
            rule.expiration.as_ref().unwrap().date.unwrap().to_string(),
            "2024-01-01"
        );
    }

    #[tokio::test]
    async fn clearing_tags_with_empty_string() {
        let store = store();
        let opts = RuleOptions {
            tags: Some("".into()),
            ..edit("a")
        };

        run(&store, &target(), opts, &TierPolicy::default(), now())
            .await
            .unwrap();

        let rules = store.get("bucket").unwrap();
        assert!(rules.rules[0].tags().is_empty());
        assert_eq!(rules.rules[0].filter.prefix.as_deref(), Some("a/"));
    }

    #[tokio::test]
    async fn failing_on_unknown_rules() {
        let err = run(&store(), &target(), edit("c"), &TierPolicy::default(), now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Operation);
        assert!(err.message().contains("`c` not found"));
    }

    #[tokio::test]
    async fn failing_on_missing_configuration() {
        let store = MemoryStore::default();
        let err = run(&store, &target(), edit("a"), &TierPolicy::default(), now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Operation);
        assert!(err.message().starts_with("s3://bucket (rule `a`)"));
    }

    #[tokio::test]
    async fn revalidating_edited_rules() {
        let store = store();
        let opts = RuleOptions {
            transition_date: Some("2030-01-01".into()),
            transition_tier: Some("cold".into()),
            ..edit("a")
        };

        let err = run(&store, &target(), opts, &TierPolicy::default(), now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            store.get("bucket").unwrap().rules[0].transition,
            None
        );
    }
}
