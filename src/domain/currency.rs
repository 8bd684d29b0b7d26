use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// ISO-4217 style currency code: exactly three uppercase ASCII letters.
///
/// Crypto assets tracked by the app (BTC, ETH) use the same three-letter form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Currency([u8; 3]);

impl Currency {
    pub const ZAR: Currency = Currency(*b"ZAR");
    pub const USD: Currency = Currency(*b"USD");
    pub const EUR: Currency = Currency(*b"EUR");
    pub const GBP: Currency = Currency(*b"GBP");
    pub const BTC: Currency = Currency(*b"BTC");
    pub const ETH: Currency = Currency(*b"ETH");

    /// Parse a currency code. Lowercase input is rejected, not uppercased.
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidCurrency("currency code is required".to_string()));
        }
        let bytes = trimmed.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(DomainError::InvalidCurrency(format!(
                "currency code must be 3 uppercase letters, got '{}'",
                trimmed
            )));
        }
        Ok(Currency([bytes[0], bytes[1], bytes[2]]))
    }

    /// Parse user input that may be lowercase (request bodies), e.g. "usd" -> USD.
    pub fn normalize(code: &str) -> Result<Self, DomainError> {
        Self::from_code(&code.trim().to_ascii_uppercase())
    }

    pub fn code(&self) -> &str {
        // Construction guarantees ASCII
        std::str::from_utf8(&self.0).unwrap_or("???")
    }

    pub fn is_crypto(&self) -> bool {
        matches!(*self, Currency::BTC | Currency::ETH)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::from_code(s)
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Currency::normalize(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_codes() {
        assert_eq!(Currency::from_code("USD").unwrap(), Currency::USD);
        assert_eq!(Currency::from_code(" ZAR ").unwrap(), Currency::ZAR);
        assert_eq!(Currency::from_code("CHF").unwrap().code(), "CHF");
    }

    #[test]
    fn rejects_invalid_codes() {
        assert!(Currency::from_code("").is_err());
        assert!(Currency::from_code("usd").is_err());
        assert!(Currency::from_code("US").is_err());
        assert!(Currency::from_code("USDT").is_err());
        assert!(Currency::from_code("U5D").is_err());
    }

    #[test]
    fn normalize_uppercases_request_input() {
        assert_eq!(Currency::normalize("eur").unwrap(), Currency::EUR);
        assert!(Currency::normalize("euro").is_err());
    }

    #[test]
    fn serde_uses_plain_code() {
        let json = serde_json::to_string(&Currency::GBP).unwrap();
        assert_eq!(json, "\"GBP\"");
        let back: Currency = serde_json::from_str("\"btc\"").unwrap();
        assert_eq!(back, Currency::BTC);
        assert!(back.is_crypto());
    }
}
