use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const CMD_SERVER: &str = "server";

const ARG_PORT: &str = "port";
const ARG_DSN: &str = "dsn";
const ARG_SENDGRID_KEY: &str = "sendgrid-key";
const ARG_EMAIL_FROM: &str = "email-from";
const ARG_EMAIL_DRY_RUN: &str = "email-dry-run";
const ARG_UTC_OFFSET: &str = "utc-offset";

/// Eastern Africa Time, in minutes east of UTC.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 180;

#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub dsn: Option<String>,
    pub sendgrid_key: Option<SecretString>,
    pub email_from: Option<String>,
    pub email_dry_run: bool,
    pub utc_offset_minutes: i32,
}

impl Options {
    /// Parse server arguments from the `server` subcommand matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_optional = |id: &str| -> Option<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            port: matches
                .get_one::<u16>(ARG_PORT)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_PORT}"))?,
            dsn: read_optional(ARG_DSN),
            sendgrid_key: read_optional(ARG_SENDGRID_KEY).map(SecretString::from),
            email_from: read_optional(ARG_EMAIL_FROM),
            email_dry_run: matches.get_flag(ARG_EMAIL_DRY_RUN),
            utc_offset_minutes: matches
                .get_one::<i32>(ARG_UTC_OFFSET)
                .copied()
                .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
        })
    }
}

#[must_use]
pub fn command() -> Command {
    Command::new(CMD_SERVER)
        .about("Run the HTTP API")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("CARWASH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "PostgreSQL connection string. Without it washes are kept in memory and lost on restart.",
                )
                .env("CARWASH_DSN"),
        )
        .arg(
            Arg::new(ARG_SENDGRID_KEY)
                .long(ARG_SENDGRID_KEY)
                .help("SendGrid API key used to email receipts")
                .env("CARWASH_SENDGRID_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("Sender address for receipt emails (defaults to the recipient)")
                .env("CARWASH_EMAIL_FROM"),
        )
        .arg(
            Arg::new(ARG_EMAIL_DRY_RUN)
                .long(ARG_EMAIL_DRY_RUN)
                .help("Log receipt emails instead of sending them")
                .env("CARWASH_EMAIL_DRY_RUN")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_UTC_OFFSET)
                .long(ARG_UTC_OFFSET)
                .help("Offset from UTC in minutes used for receipt dates and daily reports")
                .default_value("180")
                .env("CARWASH_UTC_OFFSET")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i32).range(-1439..=1439)),
        )
}
