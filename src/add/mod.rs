//! Add a lifecycle rule to a bucket, replacing any rule with the same ID.
use clap::{App, ArgMatches, SubCommand};

use std::time::SystemTime;

use crate::cli::{self, Globals};
use crate::message::{print_msg, AddMessage, SUCCESS};
use crate::rule::validate::ensure_future_dates;
use crate::rule::{build_rule, upsert_rule, validate, RuleOptions, TierPolicy};
use crate::store::{LifecycleStore, S3Store, Target};
use crate::types::{UtilError, UtilResult};

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("add")
        .about("Add a lifecycle configuration rule to a bucket")
        .arg(cli::target_arg())
        .args(&cli::rule_args())
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(store: S3Store, args: &ArgMatches<'_>, globals: &Globals) -> UtilResult<()> {
    let target = cli::get_target(args)?;
    let opts = cli::rule_options(args);

    let msg = run(&store, &target, opts, &globals.policy, SystemTime::now()).await?;
    print_msg(&msg, globals.json, &globals.theme)
}

/// Builds, validates and stores a new rule for the target.
///
/// When no prefix is provided, the prefix of the target is used instead.
pub async fn run<S: LifecycleStore>(
    store: &S,
    target: &Target,
    mut opts: RuleOptions,
    policy: &TierPolicy,
    now: SystemTime,
) -> UtilResult<AddMessage> {
    if opts.prefix.is_none() {
        opts.prefix = target.prefix.clone();
    }

    // nothing is fetched until the rule is known to be valid
    let rule = build_rule(&opts)?;
    validate(&rule, policy)?;
    ensure_future_dates(&rule, now)?;

    let id = rule.id.clone();
    let context = || format!("{} (rule `{}`)", target, id);

    info!("Fetching lifecycle configuration for {}...", target);

    let rules = store
        .fetch_or_default(target)
        .await
        .map_err(|err| UtilError::from(err).context(context()))?;

    debug!("Found {} existing rule(s)", rules.rules.len());

    let rules = upsert_rule(rules, rule);

    info!("Storing {} lifecycle rule(s) for {}...", rules.rules.len(), target);

    store
        .replace(target, &rules)
        .await
        .map_err(|err| UtilError::from(err).context(context()))?;

    Ok(AddMessage {
        status: SUCCESS,
        target: target.to_string(),
        id,
    })
}
