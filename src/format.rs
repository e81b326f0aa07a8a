// Locale-aware rendering of numeric table cells.
//
// Grouping of the integer part is delegated to `num-format` with a custom
// separator set per locale; the fractional part is produced by `format!` and
// joined with the locale's decimal mark. Nothing here knows about pivots.
use crate::error::Result;
use num_format::{CustomFormat, Grouping, ToFormattedString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberLocale {
    /// `1.234,50`
    #[default]
    PtBr,
    /// `1,234.50`
    EnUs,
}

impl NumberLocale {
    pub fn thousands_separator(self) -> &'static str {
        match self {
            NumberLocale::PtBr => ".",
            NumberLocale::EnUs => ",",
        }
    }

    pub fn decimal_separator(self) -> &'static str {
        match self {
            NumberLocale::PtBr => ",",
            NumberLocale::EnUs => ".",
        }
    }
}

/// How many fractional digits to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalPolicy {
    /// Zero decimals for whole values (counts), two for anything fractional.
    #[default]
    Auto,
    Fixed(usize),
}

/// A display cell: numbers get formatted, everything else passes through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Blank,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }
}

/// Headers plus typed cells, ready to be rendered under a locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DisplayTable {
    pub fn render(&self, formatter: &LocaleFormatter, policy: DecimalPolicy) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| formatter.format_cell(c, policy)).collect())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct LocaleFormatter {
    locale: NumberLocale,
    grouping: CustomFormat,
}

impl LocaleFormatter {
    pub fn new(locale: NumberLocale) -> Result<Self> {
        let grouping = CustomFormat::builder()
            .grouping(Grouping::Standard)
            .minus_sign("-")
            .separator(locale.thousands_separator())
            .decimal(locale.decimal_separator())
            .build()?;
        Ok(LocaleFormatter { locale, grouping })
    }

    /// Format with [`DecimalPolicy::Auto`].
    pub fn format(&self, value: f64) -> String {
        self.format_with(value, DecimalPolicy::Auto)
    }

    pub fn format_with(&self, value: f64, policy: DecimalPolicy) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        let decimals = match policy {
            DecimalPolicy::Fixed(d) => d,
            DecimalPolicy::Auto => {
                if (value * 100.0).round() % 100.0 == 0.0 {
                    0
                } else {
                    2
                }
            }
        };

        let fixed = format!("{:.*}", decimals, value.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };
        let mut res = match int_part.parse::<u128>() {
            Ok(n) => n.to_formatted_string(&self.grouping),
            Err(_) => int_part.to_string(),
        };
        if let Some(frac) = frac_part {
            res.push_str(self.locale.decimal_separator());
            res.push_str(frac);
        }

        // Rounding can collapse a small negative to zero; never print "-0".
        let is_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
        if value < 0.0 && !is_zero {
            format!("-{}", res)
        } else {
            res
        }
    }

    pub fn format_cell(&self, cell: &Cell, policy: DecimalPolicy) -> String {
        match cell {
            Cell::Number(n) => self.format_with(*n, policy),
            Cell::Text(s) => s.clone(),
            Cell::Blank => String::new(),
        }
    }

    /// Inverse of [`LocaleFormatter::format`]: strips grouping and reads the decimal mark.
    pub fn parse(&self, s: &str) -> Option<f64> {
        let s = s.trim();
        if s.is_empty() || s.chars().any(|c| c.is_alphabetic()) {
            return None;
        }
        let normalized = s
            .replace(self.locale.thousands_separator(), "")
            .replace(self.locale.decimal_separator(), ".");
        normalized.parse::<f64>().ok()
    }
}

/// One-shot helper for callers that format a single value.
pub fn format_number(value: f64, locale: NumberLocale) -> Result<String> {
    Ok(LocaleFormatter::new(locale)?.format(value))
}
