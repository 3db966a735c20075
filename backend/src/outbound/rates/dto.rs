//! DTOs for decoding the daily rates document.
//!
//! The document lists each currency with the price of `Nominal` units in the
//! base currency:
//!
//! ```text
//! {"Date":"2026-10-16T11:30:00+03:00",
//!  "Valute":{"USD":{"CharCode":"USD","Nominal":1,"Value":80.5}}}
//! ```
//!
//! Values are read through their decimal text, never through `f64`
//! arithmetic.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::domain::ports::RateTable;
use crate::domain::{CurrencyCode, Rate, parse_fixed_point};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DailyRatesDto {
    pub(super) date: DateTime<FixedOffset>,
    #[serde(default)]
    pub(super) valute: BTreeMap<String, CurrencyRateDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct CurrencyRateDto {
    pub(super) char_code: String,
    pub(super) nominal: i64,
    pub(super) value: DecimalDto,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum DecimalDto {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalDto {
    fn as_text(&self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

impl DailyRatesDto {
    /// Convert into a rate table dated in the publisher's local calendar.
    pub(super) fn into_rate_table(self) -> Result<RateTable, String> {
        let rates = self
            .valute
            .into_values()
            .map(CurrencyRateDto::into_domain_rate)
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(RateTable::new(self.date.date_naive(), rates))
    }
}

impl CurrencyRateDto {
    fn into_domain_rate(self) -> Result<(CurrencyCode, Rate), String> {
        let code = CurrencyCode::new(&self.char_code).map_err(|error| error.to_string())?;
        if self.nominal <= 0 {
            return Err(format!("{code} has non-positive nominal {}", self.nominal));
        }
        let text = self.value.as_text();
        let value = parse_fixed_point(&text).map_err(|error| format!("{code}: {error}"))?;
        let rate = Rate::from_fixed(value / self.nominal)
            .map_err(|error| format!("{code}: {error}"))?;
        Ok((code, rate))
    }
}
