// Utility helpers for turning spreadsheet cells into typed values.
//
// This module centralizes the "dirty" cell handling so the rest of the code
// can assume clean, typed records.
use calamine::Data;

/// Parse a string-like value into `f64`, returning `None` for anything that
/// cannot be safely parsed (blank, text, malformed).
///
/// A lone comma is read as the decimal mark (`"12,5"`), since that is how
/// hand-typed hour values arrive in Brazilian sheets.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let normalized = if s.contains(',') && !s.contains('.') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Spreadsheet exports sometimes write years as `2021.0`.
    match s.parse::<i32>() {
        Ok(v) => Some(v),
        Err(_) => {
            let f = s.parse::<f64>().ok()?;
            if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
                Some(f as i32)
            } else {
                None
            }
        }
    }
}

pub fn parse_month_safe(s: Option<&str>) -> Option<u8> {
    parse_i32_safe(s)
        .filter(|m| (1..=12).contains(m))
        .map(|m| m as u8)
}

/// Trimmed, non-empty text or `None`.
pub fn non_blank(s: Option<String>) -> Option<String> {
    let s = s?;
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Render an XLSX cell the way it would appear in a CSV export.
///
/// Integral floats drop their fractional part so a year stored as `2020.0`
/// reads back as `"2020"`.
pub fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                Some(format!("{:.0}", f))
            } else {
                Some(f.to_string())
            }
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
        Data::Error(_) => None,
    }
}
