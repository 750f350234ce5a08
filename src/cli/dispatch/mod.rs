//! Command-line argument dispatch.
//!
//! Maps the selected subcommand to an `Action`: running the API server or a
//! single call against a running API.

use crate::cli::actions::{client, server, Action};
use crate::cli::commands::{client as client_args, server as server_args};
use anyhow::{anyhow, Result};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or no subcommand was given.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((server_args::CMD_SERVER, sub_m)) => {
            let options = server_args::Options::parse(sub_m)?;
            Ok(Action::Server(server::Args {
                port: options.port,
                dsn: options.dsn,
                sendgrid_key: options.sendgrid_key,
                email_from: options.email_from,
                email_dry_run: options.email_dry_run,
                utc_offset_minutes: options.utc_offset_minutes,
            }))
        }
        Some((name, sub_m)) => {
            let options = client_args::Options::parse(name, sub_m)?;
            Ok(Action::Client(client::Args {
                api_url: options.api_url,
                request: options.request,
            }))
        }
        None => Err(anyhow!("missing subcommand")),
    }
}
