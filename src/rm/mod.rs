//! Remove lifecycle rules from a bucket, by ID or all at once.
use clap::{App, Arg, ArgGroup, ArgMatches, SubCommand};

use crate::cli::{self, Globals};
use crate::message::{print_msg, RemoveMessage, SUCCESS};
use crate::rule::{remove_rule, RuleSet};
use crate::store::{LifecycleStore, S3Store, Target};
use crate::types::{UtilError, UtilResult};

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("rm")
        .about("Remove lifecycle configuration rules from a bucket")
        .arg(cli::target_arg())
        .args(&[
            Arg::with_name("id")
                .help("The identifier of the rule to remove")
                .long("id")
                .takes_value(true),
            Arg::with_name("all")
                .help("Remove every rule (requires --force)")
                .long("all")
                .requires("force"),
            Arg::with_name("force")
                .help("Confirm removal of every rule")
                .long("force")
                .requires("all"),
        ])
        .group(
            ArgGroup::with_name("selector")
                .args(&["id", "all"])
                .required(true),
        )
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(store: S3Store, args: &ArgMatches<'_>, globals: &Globals) -> UtilResult<()> {
    let target = cli::get_target(args)?;
    let selector = match args.value_of("id") {
        Some(id) => Selector::Id(id.to_string()),
        None => Selector::All,
    };

    let msg = run(&store, &target, selector).await?;
    print_msg(&msg, globals.json, &globals.theme)
}

/// The rules to remove.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    All,
}

/// Removes the selected rules from the target.
///
/// Removing the last remaining rule deletes the configuration entirely.
pub async fn run<S: LifecycleStore>(
    store: &S,
    target: &Target,
    selector: Selector,
) -> UtilResult<RemoveMessage> {
    let id = match selector {
        Selector::Id(id) => id,
        Selector::All => {
            info!("Removing lifecycle configuration for {}...", target);

            store
                .replace(target, &RuleSet::default())
                .await
                .map_err(|err| UtilError::from(err).context(target))?;

            return Ok(RemoveMessage {
                status: SUCCESS,
                id: String::new(),
                target: target.to_string(),
                all: true,
            });
        }
    };

    let context = || format!("{} (rule `{}`)", target, id);

    info!("Fetching lifecycle configuration for {}...", target);

    let rules = store
        .fetch(target)
        .await
        .map_err(|err| UtilError::from(err).context(context()))?;

    let rules = remove_rule(rules, &id).map_err(|err| UtilError::from(err).context(target))?;

    if rules.is_empty() {
        debug!("Last rule removed, deleting lifecycle configuration");
    }

    store
        .replace(target, &rules)
        .await
        .map_err(|err| UtilError::from(err).context(context()))?;

    Ok(RemoveMessage {
        status: SUCCESS,
        id,
        target: target.to_string(),
        all: false,
    })
}
