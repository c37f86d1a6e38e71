//! Replace the lifecycle configuration of a bucket with JSON from stdin.
use clap::{App, ArgMatches, SubCommand};

use std::io::{self, Read};

use crate::cli::{self, Globals};
use crate::message::{print_msg, ImportMessage, SUCCESS};
use crate::rule::validate::validate_set;
use crate::rule::{RuleSet, TierPolicy};
use crate::store::{LifecycleStore, S3Store, Target};
use crate::types::{ErrorKind, UtilError, UtilResult};

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("import")
        .about("Import a JSON lifecycle configuration from stdin")
        .arg(cli::target_arg())
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(store: S3Store, args: &ArgMatches<'_>, globals: &Globals) -> UtilResult<()> {
    let target = cli::get_target(args)?;

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let msg = run(&store, &target, &input, &globals.policy).await?;
    print_msg(&msg, globals.json, &globals.theme)
}

/// Parses, validates and stores a full rule set.
///
/// Every rule is validated (and IDs checked for duplicates) before the
/// configuration is replaced; an empty set removes the configuration.
pub async fn run<S: LifecycleStore>(
    store: &S,
    target: &Target,
    input: &str,
    policy: &TierPolicy,
) -> UtilResult<ImportMessage> {
    let rules: RuleSet = serde_json::from_str(input).map_err(|err| {
        UtilError::new(
            ErrorKind::Validation,
            format!("invalid lifecycle configuration: {}", err),
        )
    })?;

    validate_set(&rules, policy)?;

    info!("Storing {} lifecycle rule(s) for {}...", rules.rules.len(), target);

    store
        .replace(target, &rules)
        .await
        .map_err(|err| UtilError::from(err).context(target))?;

    Ok(ImportMessage {
        status: SUCCESS,
        target: target.to_string(),
        rules: rules.rules.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn target() -> Target {
        Target::parse("bucket").unwrap()
    }

    #[tokio::test]
    async fn importing_rule_sets() {
        let store = MemoryStore::default();
        let input = r#"{
            "Rules": [
                { "ID": "r1", "Status": "Enabled", "Expiration": { "Days": 30 } },
                {
                    "ID": "r2",
                    "Status": "Disabled",
                    "Filter": { "Prefix": "tmp/" },
                    "Transition": { "Date": "2030-01-01", "StorageClass": "COLD" }
                }
            ]
        }"#;

        let msg = run(&store, &target(), input, &TierPolicy::default())
            .await
            .unwrap();

        assert_eq!(msg.rules, 2);

        let rules = store.get("bucket").unwrap();
        assert_eq!(rules.rules[1].prefix(), "tmp/");
        assert_eq!(
            rules.rules[1].transition.as_ref().unwrap().date.unwrap().to_string(),
            "2030-01-01"
        );
    }

    #[tokio::test]
    async fn rejecting_duplicate_ids() {
        let store = MemoryStore::default();
        let input = r#"{ "Rules": [
            { "ID": "r1", "Status": "Enabled", "Expiration": { "Days": 30 } },
            { "ID": "r1", "Status": "Enabled", "Expiration": { "Days": 60 } }
        ] }"#;

        let err = run(&store, &target(), input, &TierPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.get("bucket").is_none());
    }

    #[tokio::test]
    async fn rejecting_malformed_input() {
        let store = MemoryStore::default();

        let err = run(&store, &target(), "{ not json", &TierPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let input = r#"{ "Rules": [
            { "ID": "r1", "Status": "Enabled", "Expiration": { "Days": 30 },
              "Transition": { "Days": 60, "StorageClass": "COLD" } }
        ] }"#;
        let err = run(&store, &target(), input, &TierPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
