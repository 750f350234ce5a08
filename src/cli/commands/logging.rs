use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names accepted by `CARWASH_LOG_LEVEL`, indexed by verbosity count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a count (`0..=5`) or a level name, case-insensitive.
#[must_use]
pub fn log_level_parser() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        let level = level.trim();
        match level.parse::<u8>() {
            Ok(count) if count <= 5 => return Ok(count),
            Ok(count) => return Err(format!("verbosity {count} is out of range (0-5)")),
            Err(_) => {}
        }

        LEVELS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(level))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("unknown log level '{level}', expected one of {LEVELS:?}"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Increase log verbosity (-v WARN, -vv INFO, -vvv DEBUG, -vvvv TRACE)")
            .long_help(
                "Increase log verbosity. CARWASH_LOG_LEVEL accepts a count or a level \
                 name (error, warn, info, debug, trace). RUST_LOG overrides both.",
            )
            .env("CARWASH_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(log_level_parser()),
    )
}
