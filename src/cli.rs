//! CLI bindings for all internal commands and modules.
//!
//! This module focuses on the common CLI bindings required to provide easy
//! APIs and consistency across all other modules. This is where the parent
//! CLI can be found, as well as utilities for fetching common switches and
//! values (such as the rule builder flags shared by `add` and `edit`).
use clap::{App, AppSettings, Arg, ArgMatches};
use rusoto_core::Region;

use crate::render::Theme;
use crate::rule::{RuleOptions, Status, TierPolicy};
use crate::store::{S3Store, Target};
use crate::types::{UtilError, UtilResult};

/// Region name used for custom endpoints when none is provided.
const DEFAULT_CUSTOM_REGION: &str = "us-east-1";

/// Constructs a new CLI application using Clap.
///
/// This will register all subcommand modules and embed all metadata. All
/// metadata is fetched dynamically from Cargo and shouldn't require to
/// be updated (ever).
pub fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("")
        .name(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .args(&global_args())
        .subcommand(crate::ls::cmd())
        .subcommand(crate::add::cmd())
        .subcommand(crate::edit::cmd())
        .subcommand(crate::rm::cmd())
        .subcommand(crate::export::cmd())
        .subcommand(crate::import::cmd())
        .settings(&[
            AppSettings::ArgRequiredElseHelp,
            AppSettings::DisableHelpSubcommand,
            AppSettings::SubcommandRequiredElseHelp,
            AppSettings::VersionlessSubcommands,
        ])
}

/// Executes a subcommand based on the parsed arguments from the CLI.
///
/// This will pass a singleton `S3Store` to each submodule to avoid
/// having to construct a client inside each module.
pub async fn exec(store: S3Store, args: &ArgMatches<'_>) -> UtilResult<()> {
    match args.subcommand() {
        ("ls", Some(subargs)) => crate::ls::exec(store, subargs, &Globals::from_args(subargs)).await,
        ("add", Some(subargs)) => crate::add::exec(store, subargs, &Globals::from_args(subargs)).await,
        ("edit", Some(subargs)) => crate::edit::exec(store, subargs, &Globals::from_args(subargs)).await,
        ("rm", Some(subargs)) => crate::rm::exec(store, subargs, &Globals::from_args(subargs)).await,
        ("export", Some(subargs)) => crate::export::exec(store, subargs).await,
        ("import", Some(subargs)) => crate::import::exec(store, subargs, &Globals::from_args(subargs)).await,
        _ => {
            build().print_help()?;
            Ok(())
        }
    }
}

/// Prints help for the subcommand in use, or for the whole application.
pub fn print_help(args: &ArgMatches<'_>) {
    let printed = match args.subcommand_name() {
        Some("ls") => crate::ls::cmd().print_help(),
        Some("add") => crate::add::cmd().print_help(),
        Some("edit") => crate::edit::cmd().print_help(),
        Some("rm") => crate::rm::cmd().print_help(),
        Some("export") => crate::export::cmd().print_help(),
        Some("import") => crate::import::cmd().print_help(),
        _ => build().print_help(),
    };

    // help is best effort, the error itself has already been logged
    if printed.is_ok() {
        println!();
    }
}

/// Determines whether the command in use writes JSON to stdout.
///
/// This covers `--json` as well as `export`, which always prints JSON.
pub fn writes_json(args: &ArgMatches<'_>) -> bool {
    args.subcommand_name() == Some("export") || active_args(args).is_present("json")
}

/// Returns the matches of the subcommand in use, if any.
///
/// Global arguments are propagated down into subcommands, so these hold
/// every switch regardless of where it was placed on the command line.
pub fn active_args<'a>(args: &'a ArgMatches<'a>) -> &'a ArgMatches<'a> {
    args.subcommand().1.unwrap_or(args)
}

/// Settings shared by every command, resolved from global arguments.
#[derive(Clone, Debug)]
pub struct Globals {
    pub json: bool,
    pub theme: Theme,
    pub policy: TierPolicy,
}

impl Globals {
    /// Resolves the global settings from a set of matches.
    pub fn from_args(args: &ArgMatches<'_>) -> Globals {
        let json = args.is_present("json");

        // JSON output and --no-color both force plain output
        let theme = if json || args.is_present("no-color") {
            Theme::plain()
        } else {
            Theme::detect()
        };

        // the minimum age policy applies to the provided classes
        let mut policy = TierPolicy::default();
        if let Some(classes) = args.values_of("reduced-availability-class") {
            policy.storage_classes = classes.map(str::to_uppercase).collect();
        }

        Globals {
            json,
            theme,
            policy,
        }
    }
}

/// Fetches the target bucket/prefix pair from the common argument set.
pub fn get_target(args: &ArgMatches<'_>) -> UtilResult<Target> {
    let input = args.value_of("target").unwrap_or("");
    Target::parse(input)
        .ok_or_else(|| UtilError::usage(format!("invalid target `{}`, expected bucket[/prefix]", input)))
}

/// Resolves the region to connect to, including custom endpoints.
pub fn get_region(args: &ArgMatches<'_>) -> UtilResult<Region> {
    let name = args.value_of("region");

    // custom endpoints always use a custom region
    if let Some(endpoint) = args.value_of("endpoint") {
        return Ok(Region::Custom {
            name: name.unwrap_or(DEFAULT_CUSTOM_REGION).to_string(),
            endpoint: endpoint.to_string(),
        });
    }

    match name {
        None => Ok(Region::default()),
        Some(name) => name
            .parse()
            .map_err(|_| UtilError::usage(format!("invalid region `{}`", name))),
    }
}

/// Fetches the set of global arguments which should be attached to the app.
pub fn global_args<'a, 'b>() -> [Arg<'a, 'b>; 7] {
    [
        Arg::with_name("json")
            .help("Print results as JSON")
            .long("json")
            .global(true),
        Arg::with_name("quiet")
            .help("Only prints errors and results during execution")
            .short("q")
            .long("quiet")
            .global(true),
        Arg::with_name("verbose")
            .help("Prints debug output during execution")
            .short("v")
            .long("verbose")
            .conflicts_with("quiet")
            .global(true),
        Arg::with_name("no-color")
            .help("Disables colored output")
            .long("no-color")
            .global(true),
        Arg::with_name("endpoint")
            .help("A custom S3 compatible endpoint to connect to")
            .long("endpoint")
            .env("S3_ENDPOINT")
            .takes_value(true)
            .global(true),
        Arg::with_name("region")
            .help("The region of the endpoint")
            .long("region")
            .env("AWS_DEFAULT_REGION")
            .takes_value(true)
            .global(true),
        Arg::with_name("reduced-availability-class")
            .help("Storage classes requiring transitions after 30 days or more")
            .long("reduced-availability-class")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
            .global(true),
    ]
}

/// Fetches the positional target argument, shared by every command.
pub fn target_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("target")
        .help("An S3 bucket (and optional prefix) to work within")
        .index(1)
        .required(true)
}

/// Fetches the rule builder arguments shared by `add` and `edit`.
pub fn rule_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    let value = |name: &'a str, help: &'a str| {
        Arg::with_name(name)
            .help(help)
            .long(name)
            .takes_value(true)
    };

    vec![
        value("id", "The identifier of the lifecycle rule"),
        value("prefix", "The object prefix the rule applies to"),
        value("tags", "Object tags to filter on, as k1=v1&k2=v2").empty_values(true),
        value("size-lt", "Only apply to objects smaller than this size"),
        value("size-gt", "Only apply to objects larger than this size"),
        value("expire-days", "Number of days after which objects expire")
            .conflicts_with("expire-date"),
        value("expire-date", "Date on which objects expire, as YYYY-MM-DD"),
        Arg::with_name("expire-delete-marker")
            .help("Remove expired object delete markers")
            .long("expire-delete-marker"),
        Arg::with_name("expire-all-versions")
            .help("Expire every version of matching objects")
            .long("expire-all-versions"),
        value("transition-days", "Number of days after which objects transition")
            .conflicts_with("transition-date"),
        value("transition-date", "Date on which objects transition, as YYYY-MM-DD"),
        value("transition-tier", "The remote tier objects transition to"),
        value("noncurrent-expire-days", "Days after which noncurrent versions expire"),
        value("noncurrent-expire-newer", "Number of newer noncurrent versions to retain"),
        value("noncurrent-transition-days", "Days after which noncurrent versions transition"),
        value("noncurrent-transition-tier", "The remote tier noncurrent versions transition to"),
        value("noncurrent-transition-newer", "Number of newer noncurrent versions to keep in place"),
        Arg::with_name("disable")
            .help("Create the rule in a disabled state")
            .long("disable"),
    ]
}

/// Collects the rule builder arguments into a set of `RuleOptions`.
pub fn rule_options(args: &ArgMatches<'_>) -> RuleOptions {
    let value = |name: &str| args.value_of(name).map(str::to_string);

    // status is only set when a switch was provided
    let status = if args.is_present("disable") {
        Some(Status::Disabled)
    } else if args.is_present("enable") {
        Some(Status::Enabled)
    } else {
        None
    };

    RuleOptions {
        id: value("id"),
        prefix: value("prefix"),
        tags: value("tags"),
        size_lt: value("size-lt"),
        size_gt: value("size-gt"),
        expire_days: value("expire-days"),
        expire_date: value("expire-date"),
        expire_delete_marker: args.is_present("expire-delete-marker"),
        expire_all_versions: args.is_present("expire-all-versions"),
        transition_days: value("transition-days"),
        transition_date: value("transition-date"),
        transition_tier: value("transition-tier"),
        noncurrent_expire_days: value("noncurrent-expire-days"),
        noncurrent_expire_newer: value("noncurrent-expire-newer"),
        noncurrent_transition_days: value("noncurrent-transition-days"),
        noncurrent_transition_tier: value("noncurrent-transition-tier"),
        noncurrent_transition_newer: value("noncurrent-transition-newer"),
        status,
    }
}
