//! Export the lifecycle configuration of a bucket as JSON.
use clap::{App, ArgMatches, SubCommand};

use crate::cli;
use crate::render;
use crate::rule::RuleSet;
use crate::store::{LifecycleStore, S3Store, Target};
use crate::types::{UtilError, UtilResult};

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("export")
        .about("Export the lifecycle configuration of a bucket as JSON")
        .arg(cli::target_arg())
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(store: S3Store, args: &ArgMatches<'_>) -> UtilResult<()> {
    let target = cli::get_target(args)?;
    let rules = run(&store, &target).await?;

    // always JSON, regardless of flags
    println!("{}", render::render_json(&rules)?);
    Ok(())
}

/// Fetches the rule set of the target.
pub async fn run<S: LifecycleStore>(store: &S, target: &Target) -> UtilResult<RuleSet> {
    info!("Fetching lifecycle configuration for {}...", target);

    store
        .fetch(target)
        .await
        .map_err(|err| UtilError::from(err).context(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{build_rule, RuleOptions};
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn exporting_stored_rules() {
        let rule = build_rule(&RuleOptions {
            id: Some("r1".into()),
            expire_date: Some("2030-01-01".into()),
            ..RuleOptions::default()
        })
        .unwrap();
        let store = MemoryStore::with("bucket", RuleSet::new(vec![rule]));
        let target = Target::parse("bucket").unwrap();

        let rules = run(&store, &target).await.unwrap();
        let json = render::render_json(&rules).unwrap();

        assert!(json.contains("\"Date\": \"2030-01-01T00:00:00Z\""));
        assert_eq!(serde_json::from_str::<RuleSet>(&json).unwrap(), rules);
    }

    #[tokio::test]
    async fn failing_on_missing_configuration() {
        let target = Target::parse("bucket").unwrap();
        assert!(run(&MemoryStore::default(), &target).await.is_err());
    }
}
