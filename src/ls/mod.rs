//! List the lifecycle rules of a bucket as a table.
use clap::{App, Arg, ArgMatches, SubCommand};

use crate::cli::{self, Globals};
use crate::message::{print_msg, ListMessage, SUCCESS};
use crate::render::{self, Theme, View};
use crate::store::{LifecycleStore, S3Store, Target};
use crate::types::{UtilError, UtilResult};

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("ls")
        .about("List lifecycle configuration rules set on a bucket")
        .arg(cli::target_arg())
        .args(&[
            Arg::with_name("minimum")
                .help("Display only the ID, prefix, status and action markers")
                .long("minimum"),
            Arg::with_name("expiry")
                .help("Display only expiration fields")
                .long("expiry"),
            Arg::with_name("transition")
                .help("Display only transition fields")
                .long("transition"),
        ])
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(store: S3Store, args: &ArgMatches<'_>, globals: &Globals) -> UtilResult<()> {
    let target = cli::get_target(args)?;
    let view = get_view(args)?;

    let msg = run(&store, &target, view, &globals.theme).await?;
    print_msg(&msg, globals.json, &globals.theme)
}

/// Resolves the display view, allowing at most one display flag.
pub fn get_view(args: &ArgMatches<'_>) -> UtilResult<View> {
    let flags = [
        (args.is_present("minimum"), View::Minimum),
        (args.is_present("expiry"), View::Expiry),
        (args.is_present("transition"), View::Transition),
        (args.is_present("json"), View::All),
    ];

    let mut enabled = flags.iter().filter(|(present, _)| *present);
    match (enabled.next(), enabled.next()) {
        (Some(_), Some(_)) => Err(UtilError::usage(
            "only one display field flag is allowed per ls command",
        )),
        (Some((_, view)), None) => Ok(*view),
        (None, _) => Ok(View::All),
    }
}

/// Fetches and renders the rule set of the target.
///
/// A missing configuration, or a view which matches no rules, is not an
/// error here; the condition is printed in place of the table.
pub async fn run<S: LifecycleStore>(
    store: &S,
    target: &Target,
    view: View,
    theme: &Theme,
) -> UtilResult<ListMessage> {
    info!("Fetching lifecycle configuration for {}...", target);

    let config = store
        .fetch_or_default(target)
        .await
        .map_err(|err| UtilError::from(err).context(target))?;

    debug!("Found {} lifecycle rule(s)", config.rules.len());

    let table = match render::render(&config, view, theme) {
        Ok(table) => table,
        Err(err) => format!("{}: {}", theme.value(&target.to_string()), err),
    };

    Ok(ListMessage {
        status: SUCCESS,
        target: target.to_string(),
        config,
        table,
    })
}
