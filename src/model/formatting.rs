use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number and date rendering handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formatting {
    pub decimal_separator: char,
    pub date_format: String,
    pub datetime_format: String,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            date_format: "%Y-%m-%d".to_string(),
            datetime_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl Formatting {
    /// Prices always render with two decimals.
    pub fn price(&self, price: &Decimal) -> String {
        let text = format!("{:.2}", price.round_dp(2));
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }

    pub fn date(&self, date: &NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    pub fn timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        timestamp.format(&self.datetime_format).to_string()
    }
}
