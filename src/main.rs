//! Lifecycle (ILM) rule management for S3 compatible storage in a CLI.
//!
//! This tool should be used from a command line and can be used to list,
//! add, edit, remove, export and import the lifecycle rules of a bucket;
//! please see the main documentation in the repository.
//!
//! Credentials must be provided via guidelines in the [AWS Documentation]
//! (https://docs.aws.amazon.com/cli/latest/userguide/cli-environment.html).
#[macro_use]
extern crate log as logger;

use clap::ArgMatches;
use rusoto_core::{credential::ChainProvider, Client, HttpClient};

use std::process;
use std::time::Duration;

mod cli;
mod log;
mod message;
mod render;
mod rule;
mod store;
mod types;

mod add;
mod edit;
mod export;
mod import;
mod ls;
mod rm;

use crate::store::S3Store;
use crate::types::{ErrorKind, UtilError, UtilResult, USAGE_EXIT_CODE};

#[tokio::main]
async fn main() {
    // build the CLI and grab all arguments
    let args = match cli::build().get_matches_safe() {
        Ok(args) => args,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            eprintln!("{}", err.message);
            process::exit(USAGE_EXIT_CODE);
        }
    };

    // initialize logging
    if let Err(err) = log::init(&args) {
        eprintln!("{}", err);
        process::exit(ErrorKind::Operation.exit_code());
    }

    // run the command, unless the user cancels it first
    let result = tokio::select! {
        result = run(&args) => result,
        _ = tokio::signal::ctrl_c() => {
            Err(UtilError::new(ErrorKind::Interrupted, "interrupted"))
        }
    };

    if let Err(err) = result {
        error!("{}", err);

        // usage errors come with the command help
        if err.kind() == ErrorKind::Usage {
            cli::print_help(&args);
        }

        process::exit(err.kind().exit_code());
    }
}

/// Creates the lifecycle store and delegates to the cli mod.
async fn run(args: &ArgMatches<'_>) -> UtilResult<()> {
    // create client options
    let client = HttpClient::new()?;
    let region = cli::get_region(cli::active_args(args))?;

    debug!("Using region {:?}", region);

    // create provided with timeout
    let mut chain = ChainProvider::new();
    chain.set_timeout(Duration::from_millis(500));

    // create the new signing client and store
    let client = Client::new_with(chain, client);
    let store = S3Store::new(client, region);

    // delegate to the cli mod
    cli::exec(store, args).await
}
