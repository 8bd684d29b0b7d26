//! Net worth in the user's home currency.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::currency::Currency;
use super::kinds::AccountType;
use super::money::Money;
use super::DomainError;

/// One active account as it feeds the net worth.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub account_id: Uuid,
    pub account_type: AccountType,
    pub is_liability: bool,
    pub balance: Money,
    /// Multiplier into the home currency; `None` when no rate is stored.
    pub rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthSummary {
    pub home_currency: Currency,
    pub total_assets: Money,
    pub total_liabilities: Money,
    pub net_worth: Money,
    /// Home-currency value per account type; liabilities count negative.
    pub by_type: BTreeMap<String, Decimal>,
    /// Native amount per currency; liabilities count negative.
    pub by_currency: BTreeMap<String, Decimal>,
    pub account_count: usize,
    /// Accounts left out of the totals for lack of an FX rate.
    pub unconverted: Vec<Uuid>,
}

/// Assets minus liabilities. Liability balances are amounts owed, so a
/// liability of 500 lowers the net worth by 500.
pub fn summarize(home: Currency, holdings: &[Holding]) -> Result<NetWorthSummary, DomainError> {
    let mut assets = Money::zero(home);
    let mut liabilities = Money::zero(home);
    let mut by_type: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut by_currency: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut unconverted = Vec::new();

    for holding in holdings {
        let signed = if holding.is_liability { -holding.balance } else { holding.balance };
        accumulate(&mut by_currency, holding.balance.currency.code(), signed.amount)?;

        let Some(rate) = holding.rate else {
            unconverted.push(holding.account_id);
            continue;
        };
        let converted = holding.balance.checked_mul(rate)?.round(4);
        let home_value = Money::new(converted.amount, home);
        if holding.is_liability {
            liabilities = liabilities.checked_add(&home_value)?;
            accumulate(&mut by_type, holding.account_type.as_str(), -home_value.amount)?;
        } else {
            assets = assets.checked_add(&home_value)?;
            accumulate(&mut by_type, holding.account_type.as_str(), home_value.amount)?;
        }
    }

    Ok(NetWorthSummary {
        home_currency: home,
        total_assets: assets,
        total_liabilities: liabilities,
        net_worth: assets.checked_sub(&liabilities)?,
        by_type,
        by_currency,
        account_count: holdings.len(),
        unconverted,
    })
}

fn accumulate(map: &mut BTreeMap<String, Decimal>, key: &str, amount: Decimal) -> Result<(), DomainError> {
    let entry = map.entry(key.to_string()).or_insert(Decimal::ZERO);
    *entry = entry.checked_add(amount).ok_or(DomainError::Overflow)?;
    Ok(())
}

/// Look-back period for the snapshot history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl HistoryPeriod {
    /// Unknown or missing periods fall back to one year.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("1M") => HistoryPeriod::OneMonth,
            Some("3M") => HistoryPeriod::ThreeMonths,
            Some("6M") => HistoryPeriod::SixMonths,
            Some("ALL") => HistoryPeriod::All,
            _ => HistoryPeriod::OneYear,
        }
    }

    /// First snapshot date included. `ALL` reaches back ten years.
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        let months = match self {
            HistoryPeriod::OneMonth => 1,
            HistoryPeriod::ThreeMonths => 3,
            HistoryPeriod::SixMonths => 6,
            HistoryPeriod::OneYear => 12,
            HistoryPeriod::All => 120,
        };
        today.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChange {
    pub change: Decimal,
    pub change_percent: Decimal,
}

/// Change from the first to the last value, with the percentage rounded to
/// two places. Zero with fewer than two points or a zero starting value.
pub fn history_change(values: &[Decimal]) -> HistoryChange {
    let zero = HistoryChange {
        change: Decimal::ZERO,
        change_percent: Decimal::ZERO,
    };
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return zero;
    };
    if values.len() < 2 {
        return zero;
    }
    let Some(change) = last.checked_sub(*first) else {
        return zero;
    };
    let change_percent = change
        .checked_div(*first)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ZERO, |p| p.round_dp(2));
    HistoryChange { change, change_percent }
}
