use crate::{
    api::{
        self,
        email::{EmailSender, LogEmailSender, SendGridSender},
        AppState,
    },
    cli::telemetry,
    wash::{MemoryWashStore, PgWashStore, WashStore},
};
use anyhow::{Context, Result};
use chrono::FixedOffset;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub sendgrid_key: Option<SecretString>,
    pub email_from: Option<String>,
    pub email_dry_run: bool,
    pub utc_offset_minutes: i32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the email sender cannot be built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let offset = utc_offset(args.utc_offset_minutes)?;

    let store: Arc<dyn WashStore> = match &args.dsn {
        Some(dsn) => {
            let store = PgWashStore::connect(dsn).await?;
            store.migrate().await.context("Failed to apply schema")?;
            Arc::new(store)
        }
        None => {
            warn!("No DSN configured, washes are kept in memory only");
            Arc::new(MemoryWashStore::new())
        }
    };

    let email = email_sender(&args)?;
    if email.is_none() {
        warn!("No email sender configured, receipt emails are disabled");
    }

    let state = Arc::new(AppState::new(store, email, offset));
    let result = api::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}

fn utc_offset(minutes: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(minutes * 60)
        .with_context(|| format!("Invalid UTC offset: {minutes} minutes"))
}

fn email_sender(args: &Args) -> Result<Option<Arc<dyn EmailSender>>> {
    if args.email_dry_run {
        return Ok(Some(Arc::new(LogEmailSender)));
    }

    match &args.sendgrid_key {
        Some(key) => {
            let sender = SendGridSender::new(key.clone(), args.email_from.clone())?;
            Ok(Some(Arc::new(sender)))
        }
        None => Ok(None),
    }
}

fn email_mode(args: &Args) -> &'static str {
    if args.email_dry_run {
        "log"
    } else if args.sendgrid_key.is_some() {
        "sendgrid"
    } else {
        "disabled"
    }
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "store",
            args.dsn
                .as_deref()
                .map_or_else(|| "memory".to_string(), redact_dsn),
        ),
        ("email", email_mode(args).to_string()),
        (
            "email_from",
            args.email_from
                .clone()
                .unwrap_or_else(|| "recipient".to_string()),
        ),
        ("utc_offset_minutes", args.utc_offset_minutes.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", carwash_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn carwash_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    CARWASH_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const CARWASH_BANNER: &str = r"
    o  o  o
   ___________
  /  |     |  \___
 |___|_____|______|  C A R W A S H {VERSION}
   (_)       (_)";
