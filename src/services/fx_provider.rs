//! Exchange-rate sources.
//!
//! The CoinGecko provider fetches crypto prices and fiat cross rates, keeps the
//! last good result in memory and serves it while fresh. When a refresh yields
//! nothing it falls back to the stale result, or to an empty list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::FxConfig;
use crate::domain::Currency;

pub const COINGECKO_SOURCE: &str = "coingecko";

/// CoinGecko coin ids for the supported crypto assets.
const CRYPTO_IDS: &[(Currency, &str)] = &[(Currency::BTC, "bitcoin"), (Currency::ETH, "ethereum")];

const FIAT: &[Currency] = &[Currency::ZAR, Currency::USD, Currency::EUR, Currency::GBP];

#[derive(Debug, Error)]
pub enum FxError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {0}")]
    Status(u16),

    #[error("Unexpected provider response: {0}")]
    Parse(String),
}

/// One `base -> quote` rate: 1 unit of `base` costs `rate` units of `quote`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FxQuote {
    pub base: Currency,
    pub quote: Currency,
    pub rate: Decimal,
    pub as_of: DateTime<Utc>,
}

#[async_trait]
pub trait FxRateProvider: Send + Sync {
    fn source(&self) -> &'static str;

    async fn rates(&self) -> Result<Vec<FxQuote>, FxError>;
}

struct CachedRates {
    fetched_at: Instant,
    quotes: Vec<FxQuote>,
}

pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    ttl: Duration,
    cache: RwLock<Option<CachedRates>>,
}

impl CoinGeckoProvider {
    pub fn new(config: &FxConfig) -> Result<Self, FxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: RwLock::new(None),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, FxError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FxError::Status(response.status().as_u16()));
        }
        Ok(response.json::<Value>().await?)
    }

    async fn fetch_crypto(&self, now: DateTime<Utc>) -> Result<Vec<FxQuote>, FxError> {
        let ids: Vec<&str> = CRYPTO_IDS.iter().map(|(_, id)| *id).collect();
        let vs: Vec<String> = FIAT.iter().map(|c| c.code().to_lowercase()).collect();
        let path = format!("/simple/price?ids={}&vs_currencies={}", ids.join(","), vs.join(","));
        let body = self.get_json(&path).await?;
        Ok(parse_simple_price(&body, now))
    }

    async fn fetch_fiat(&self, now: DateTime<Utc>) -> Result<Vec<FxQuote>, FxError> {
        let body = self.get_json("/exchange_rates").await?;
        parse_exchange_rates(&body, now)
    }

    async fn fresh_cached(&self) -> Option<Vec<FxQuote>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.quotes.clone())
    }
}

#[async_trait]
impl FxRateProvider for CoinGeckoProvider {
    fn source(&self) -> &'static str {
        COINGECKO_SOURCE
    }

    async fn rates(&self) -> Result<Vec<FxQuote>, FxError> {
        if let Some(quotes) = self.fresh_cached().await {
            debug!("Returning {} cached FX rates", quotes.len());
            return Ok(quotes);
        }

        let now = Utc::now();
        let mut quotes = Vec::new();
        match self.fetch_crypto(now).await {
            Ok(mut q) => quotes.append(&mut q),
            Err(e) => warn!("Failed to fetch crypto rates: {}", e),
        }
        match self.fetch_fiat(now).await {
            Ok(mut q) => quotes.append(&mut q),
            Err(e) => warn!("Failed to fetch fiat rates: {}", e),
        }

        let mut cache = self.cache.write().await;
        if quotes.is_empty() {
            return match cache.as_ref() {
                Some(stale) => {
                    warn!("Using {} stale FX rates", stale.quotes.len());
                    Ok(stale.quotes.clone())
                }
                None => {
                    warn!("No FX rates available");
                    Ok(Vec::new())
                }
            };
        }

        info!("Fetched and cached {} FX rates from CoinGecko", quotes.len());
        *cache = Some(CachedRates {
            fetched_at: Instant::now(),
            quotes: quotes.clone(),
        });
        Ok(quotes)
    }
}

fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

/// `{"bitcoin": {"zar": 1234.5, ...}, ...}` into crypto -> fiat quotes.
fn parse_simple_price(body: &Value, now: DateTime<Utc>) -> Vec<FxQuote> {
    let mut quotes = Vec::new();
    for (crypto, id) in CRYPTO_IDS {
        let Some(prices) = body.get(*id) else {
            continue;
        };
        for fiat in FIAT {
            let key = fiat.code().to_lowercase();
            if let Some(rate) = prices.get(&key).and_then(json_decimal).filter(|r| r.is_sign_positive() && !r.is_zero()) {
                quotes.push(FxQuote {
                    base: *crypto,
                    quote: *fiat,
                    rate,
                    as_of: now,
                });
            }
        }
    }
    quotes
}

/// CoinGecko's `/exchange_rates` is BTC-based; rebase it to USD -> fiat.
fn parse_exchange_rates(body: &Value, now: DateTime<Utc>) -> Result<Vec<FxQuote>, FxError> {
    let rates = body
        .get("rates")
        .ok_or_else(|| FxError::Parse("missing 'rates'".to_string()))?;
    let value_of = |code: &str| rates.get(code).and_then(|r| r.get("value")).and_then(json_decimal);

    let usd = value_of("usd")
        .filter(|v| !v.is_zero())
        .ok_or_else(|| FxError::Parse("missing USD rate".to_string()))?;

    Ok(FIAT
        .iter()
        .filter(|c| **c != Currency::USD)
        .filter_map(|fiat| {
            value_of(&fiat.code().to_lowercase()).map(|v| FxQuote {
                base: Currency::USD,
                quote: *fiat,
                rate: v / usd,
                as_of: now,
            })
        })
        .collect())
}
