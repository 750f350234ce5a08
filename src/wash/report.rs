//! Dashboard figures and CSV export.

use super::{
    model::{PaymentMethod, Wash},
    receipt::{format_amount, local_time},
};
use chrono::{Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const CSV_HEADER: [&str; 8] = [
    "Receipt ID",
    "Plate",
    "Model",
    "Services",
    "Amount",
    "Method",
    "Date",
    "Time",
];

/// Reporting window, counted in calendar days ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum Range {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl Range {
    #[must_use]
    pub fn days(self) -> usize {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Revenue {
    pub mpesa: f64,
    pub card: f64,
    pub cash: f64,
}

impl Revenue {
    fn add(&mut self, method: PaymentMethod, amount: f64) {
        match method {
            PaymentMethod::Mpesa => self.mpesa += amount,
            PaymentMethod::Card => self.card += amount,
            PaymentMethod::Cash => self.cash += amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyCount {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub washes: u32,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub range: Range,
    /// Oldest day first; the last entry is today.
    pub daily: Vec<DailyCount>,
    pub revenue: Revenue,
    pub total_washes: usize,
    pub total_revenue: f64,
    pub paid: usize,
    pub unpaid: usize,
}

/// Aggregate the washes that fall inside `range`, ending on the day of `now_ms`.
#[must_use]
pub fn summary(washes: &[Wash], range: Range, now_ms: i64, offset: FixedOffset) -> Summary {
    let days = range.days();
    let today = local_date(now_ms, offset).unwrap_or_default();

    let mut daily: Vec<DailyCount> = (0..days)
        .map(|index| {
            let back = i64::try_from(days - 1 - index).unwrap_or_default();
            DailyCount {
                date: (today - Duration::days(back)).format("%Y-%m-%d").to_string(),
                washes: 0,
                revenue: 0.0,
            }
        })
        .collect();

    let mut revenue = Revenue::default();
    let mut paid = 0;
    let mut unpaid = 0;

    for wash in washes {
        let Some(date) = local_date(wash.timestamp, offset) else {
            continue;
        };
        let Ok(diff) = usize::try_from((today - date).num_days()) else {
            // future-dated wash
            continue;
        };
        if diff >= days {
            continue;
        }

        let bucket = &mut daily[days - 1 - diff];
        bucket.washes += 1;
        bucket.revenue += wash.amount;
        revenue.add(wash.method, wash.amount);
        if wash.paid {
            paid += 1;
        } else {
            unpaid += 1;
        }
    }

    let total_revenue = revenue.mpesa + revenue.card + revenue.cash;

    Summary {
        range,
        daily,
        revenue,
        total_washes: paid + unpaid,
        total_revenue,
        paid,
        unpaid,
    }
}

fn local_date(timestamp_ms: i64, offset: FixedOffset) -> Option<NaiveDate> {
    local_time(timestamp_ms, offset).map(|time| time.date_naive())
}

/// Export washes as CSV, one quoted row per wash.
#[must_use]
pub fn csv(washes: &[Wash], offset: FixedOffset) -> String {
    let mut lines = Vec::with_capacity(washes.len() + 1);
    lines.push(csv_row(CSV_HEADER.iter().map(|cell| (*cell).to_string())));

    for wash in washes {
        let time = local_time(wash.timestamp, offset);
        lines.push(csv_row([
            wash.receipt_no.clone().unwrap_or_else(|| wash.id.clone()),
            wash.plate.clone(),
            wash.model.clone(),
            wash.services.join("; "),
            format_amount(wash.amount),
            wash.method.to_string(),
            time.map(|t| t.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
            time.map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default(),
        ]));
    }

    lines.join("\n")
}

fn csv_row<I: IntoIterator<Item = String>>(cells: I) -> String {
    cells
        .into_iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}
