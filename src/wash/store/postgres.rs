use super::{PaymentOutcome, WashStore};
use crate::wash::{
    model::{new_wash_id, NewWash, PaymentMethod, Wash},
    now_ms,
    settings::{Settings, SettingsPatch},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Merge a settings patch in one statement. `$1..$3` seed a missing row,
/// `$4..$6` are the patch fields, NULL keeping the stored value.
const UPSERT_SETTINGS: &str = "INSERT INTO settings (id, business_name, default_receipt_email, auto_email_receipts) \
     VALUES (1, $1, $2, $3) \
     ON CONFLICT (id) DO UPDATE SET \
     business_name = COALESCE($4, settings.business_name), \
     default_receipt_email = COALESCE($5, settings.default_receipt_email), \
     auto_email_receipts = COALESCE($6, settings.auto_email_receipts) \
     RETURNING business_name, default_receipt_email, auto_email_receipts";

const WASH_COLUMNS: &str = "id, plate, model, services, amount, method, wash_timestamp, paid, receipt_no, created_at";

/// `PostgreSQL`-backed store.
#[derive(Debug, Clone)]
pub struct PgWashStore {
    pool: PgPool,
}

impl PgWashStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Apply `sql/schema.sql`. Every statement in it is idempotent.
    ///
    /// # Errors
    /// Returns an error if a statement fails.
    pub async fn migrate(&self) -> Result<()> {
        for (index, statement) in schema_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        debug!("Database schema applied");
        Ok(())
    }
}

/// Split the schema file on `;`, dropping `--` comment lines.
fn schema_statements(sql: &str) -> Vec<String> {
    let without_comments = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

fn wash_from_row(row: &PgRow) -> Result<Wash> {
    let method: String = row.try_get("method")?;
    let method = PaymentMethod::parse(&method)
        .ok_or_else(|| anyhow!("unknown payment method in database: {method}"))?;

    Ok(Wash {
        id: row.try_get("id")?,
        plate: row.try_get("plate")?,
        model: row.try_get("model")?,
        services: row.try_get("services")?,
        amount: row.try_get("amount")?,
        method,
        timestamp: row.try_get("wash_timestamp")?,
        paid: row.try_get("paid")?,
        receipt_no: row.try_get("receipt_no")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl WashStore for PgWashStore {
    async fn insert(&self, wash: NewWash) -> Result<Wash> {
        let wash = Wash::from_new(wash, new_wash_id(), now_ms());

        let span = info_span!("db.insert", db.system = "postgresql", db.table = "washes");
        sqlx::query(
            "INSERT INTO washes (id, plate, model, services, amount, method, wash_timestamp, paid, receipt_no, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&wash.id)
        .bind(&wash.plate)
        .bind(&wash.model)
        .bind(&wash.services)
        .bind(wash.amount)
        .bind(wash.method.as_str())
        .bind(wash.timestamp)
        .bind(wash.paid)
        .bind(&wash.receipt_no)
        .bind(wash.created_at)
        .execute(&self.pool)
        .instrument(span)
        .await
        .context("Failed to insert wash")?;

        Ok(wash)
    }

    async fn get(&self, id: &str) -> Result<Option<Wash>> {
        let row = sqlx::query(&format!("SELECT {WASH_COLUMNS} FROM washes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch wash")?;

        row.as_ref().map(wash_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Wash>> {
        let rows = sqlx::query(&format!(
            "SELECT {WASH_COLUMNS} FROM washes ORDER BY wash_timestamp DESC, created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list washes")?;

        rows.iter().map(wash_from_row).collect()
    }

    async fn mark_paid(&self, id: &str, receipt_no: &str) -> Result<Option<PaymentOutcome>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {WASH_COLUMNS} FROM washes WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock wash")?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let current = wash_from_row(&row)?;
        if current.paid {
            tx.rollback().await?;
            return Ok(Some(PaymentOutcome {
                wash: current,
                newly_paid: false,
            }));
        }

        let row = sqlx::query(&format!(
            "UPDATE washes SET paid = TRUE, receipt_no = COALESCE(receipt_no, $2) \
             WHERE id = $1 RETURNING {WASH_COLUMNS}"
        ))
        .bind(id)
        .bind(receipt_no)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to mark wash paid")?;

        tx.commit().await?;

        Ok(Some(PaymentOutcome {
            wash: wash_from_row(&row)?,
            newly_paid: true,
        }))
    }

    async fn settings(&self) -> Result<Settings> {
        let row = sqlx::query(
            "SELECT business_name, default_receipt_email, auto_email_receipts FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch settings")?;

        match row {
            Some(row) => Ok(Settings {
                business_name: row.try_get("business_name")?,
                default_receipt_email: row.try_get("default_receipt_email")?,
                auto_email_receipts: row.try_get("auto_email_receipts")?,
            }),
            None => Ok(Settings::default()),
        }
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let patch = patch.trimmed();
        let mut seed = Settings::default();
        seed.apply(patch.clone());

        let row = sqlx::query(UPSERT_SETTINGS)
            .bind(&seed.business_name)
            .bind(&seed.default_receipt_email)
            .bind(seed.auto_email_receipts)
            .bind(patch.business_name)
            .bind(patch.default_receipt_email)
            .bind(patch.auto_email_receipts)
            .fetch_one(&self.pool)
            .await
            .context("Failed to store settings")?;

        Ok(Settings {
            business_name: row.try_get("business_name")?,
            default_receipt_email: row.try_get("default_receipt_email")?,
            auto_email_receipts: row.try_get("auto_email_receipts")?,
        })
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await?;
        Ok(())
    }
}
