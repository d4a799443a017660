//! Locale, time zone and currency settings used when rendering messages.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Language used for message labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Nl,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        // Accept region-qualified tags such as "nl-NL" or "en_GB".
        match lower.split(['-', '_']).next().unwrap_or_default() {
            "en" => Ok(Self::En),
            "nl" => Ok(Self::Nl),
            _ => Err(format!("unsupported locale \"{s}\"; expected en or nl")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub locale: Locale,
    pub utc_offset: FixedOffset,
    pub currency_label: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            locale: Locale::En,
            utc_offset: Utc.fix(),
            currency_label: "€".to_owned(),
        }
    }
}

impl DisplaySettings {
    /// Formats a timestamp in the configured time zone, e.g.
    /// `"2024-05-01 14:03"`.
    #[must_use]
    pub fn format_timestamp(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.utc_offset)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }

    /// Prefixes a two-decimal price with the currency label.
    #[must_use]
    pub fn format_price(&self, price: &str) -> String {
        format!("{}{price}", self.currency_label)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn locale_parses_region_tags() {
        assert_eq!("nl-NL".parse::<Locale>(), Ok(Locale::Nl));
        assert_eq!("en_GB".parse::<Locale>(), Ok(Locale::En));
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::En));
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn timestamp_uses_offset() {
        let settings = DisplaySettings {
            utc_offset: FixedOffset::east_opt(2 * 3600).unwrap(),
            ..DisplaySettings::default()
        };
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 0).unwrap();
        assert_eq!(settings.format_timestamp(at), "2024-05-01 14:03");
    }

    #[test]
    fn price_gets_currency_label() {
        let settings = DisplaySettings::default();
        assert_eq!(settings.format_price("24.99"), "€24.99");
    }
}
