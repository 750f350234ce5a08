//! Subcommands that talk to a running API.

use crate::{
    client::DEFAULT_API_URL,
    wash::{catalog::catalog_total, now_ms, CreateWashRequest, PaymentMethod},
};
use anyhow::anyhow;
use clap::{builder::PossibleValuesParser, Arg, ArgAction, ArgMatches, Command};

pub const CMD_ADD: &str = "add";
pub const CMD_PAY: &str = "pay";
pub const CMD_EMAIL: &str = "email";

const ARG_API_URL: &str = "api-url";
const ARG_PLATE: &str = "plate";
const ARG_MODEL: &str = "model";
const ARG_SERVICE: &str = "service";
const ARG_AMOUNT: &str = "amount";
const ARG_METHOD: &str = "method";
const ARG_TIMESTAMP: &str = "timestamp";
const ARG_ID: &str = "id";
const ARG_TO: &str = "to";
const ARG_BUSINESS_NAME: &str = "business-name";

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Add(CreateWashRequest),
    Pay {
        id: String,
    },
    Email {
        id: String,
        to: String,
        business_name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub api_url: String,
    pub request: Request,
}

impl Options {
    /// Parse the matches of one of the client subcommands.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or `name` is not a client subcommand.
    pub fn parse(name: &str, matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        let request = match name {
            CMD_ADD => {
                let services: Vec<String> = matches
                    .get_many::<String>(ARG_SERVICE)
                    .unwrap_or_default()
                    .cloned()
                    .collect();
                let amount = matches
                    .get_one::<f64>(ARG_AMOUNT)
                    .copied()
                    .unwrap_or_else(|| catalog_total(&services));

                Request::Add(CreateWashRequest {
                    plate: Some(read_required(ARG_PLATE)?),
                    model: Some(read_required(ARG_MODEL)?),
                    services: Some(services),
                    service: None,
                    amount: Some(amount),
                    method: Some(read_required(ARG_METHOD)?),
                    timestamp: Some(
                        matches
                            .get_one::<i64>(ARG_TIMESTAMP)
                            .copied()
                            .unwrap_or_else(now_ms),
                    ),
                })
            }
            CMD_PAY => Request::Pay {
                id: read_required(ARG_ID)?,
            },
            CMD_EMAIL => Request::Email {
                id: read_required(ARG_ID)?,
                to: read_required(ARG_TO)?,
                business_name: matches
                    .get_one::<String>(ARG_BUSINESS_NAME)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
            },
            other => return Err(anyhow!("unknown client command: {other}")),
        };

        Ok(Self {
            api_url: read_required(ARG_API_URL)?,
            request,
        })
    }
}

fn with_api_url(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_API_URL)
            .long(ARG_API_URL)
            .help("Base URL of the carwash API")
            .default_value(DEFAULT_API_URL)
            .env("CARWASH_API_URL"),
    )
}

#[must_use]
pub fn add_command() -> Command {
    let methods: Vec<&'static str> = PaymentMethod::ALL.iter().map(|m| m.as_str()).collect();

    with_api_url(
        Command::new(CMD_ADD)
            .about("Log a wash")
            .arg(
                Arg::new(ARG_PLATE)
                    .long(ARG_PLATE)
                    .help("Number plate")
                    .required(true),
            )
            .arg(
                Arg::new(ARG_MODEL)
                    .long(ARG_MODEL)
                    .help("Vehicle model")
                    .required(true),
            )
            .arg(
                Arg::new(ARG_SERVICE)
                    .long(ARG_SERVICE)
                    .help("Service performed, repeat for several")
                    .action(ArgAction::Append)
                    .required(true),
            )
            .arg(
                Arg::new(ARG_AMOUNT)
                    .long(ARG_AMOUNT)
                    .help("Amount charged (defaults to the price list total)")
                    .value_parser(clap::value_parser!(f64)),
            )
            .arg(
                Arg::new(ARG_METHOD)
                    .long(ARG_METHOD)
                    .help("Payment method")
                    .value_parser(PossibleValuesParser::new(methods))
                    .required(true),
            )
            .arg(
                Arg::new(ARG_TIMESTAMP)
                    .long(ARG_TIMESTAMP)
                    .help("When the wash happened, epoch milliseconds (defaults to now)")
                    .value_parser(clap::value_parser!(i64)),
            ),
    )
}

#[must_use]
pub fn pay_command() -> Command {
    with_api_url(
        Command::new(CMD_PAY)
            .about("Mark a wash paid and print its receipt number")
            .arg(Arg::new(ARG_ID).help("Wash id").required(true)),
    )
}

#[must_use]
pub fn email_command() -> Command {
    with_api_url(
        Command::new(CMD_EMAIL)
            .about("Email the receipt of a wash")
            .arg(Arg::new(ARG_ID).help("Wash id").required(true))
            .arg(
                Arg::new(ARG_TO)
                    .long(ARG_TO)
                    .help("Recipient address")
                    .required(true),
            )
            .arg(
                Arg::new(ARG_BUSINESS_NAME)
                    .long(ARG_BUSINESS_NAME)
                    .help("Business name on the receipt (defaults to the stored settings)"),
            ),
    )
}
