// Derived per-row metrics over a pivot: variação (endpoint delta),
// oscilação (endpoint against the prior peak) and year-over-year deltas.

use crate::error::{ReportError, Result};
use crate::pivot::PivotTable;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearDelta {
    pub year: i32,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub key: Vec<String>,
    /// Aligned with the source pivot's `years`.
    pub values: Vec<f64>,
    /// Change from the previous pivot year, for every year after `min_year`
    /// up to `max_year`.
    pub deltas: Vec<YearDelta>,
    pub variacao: f64,
    pub oscilacao: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Variacao,
    Oscilacao,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most negative first: the largest decreases.
    Ascending,
    Descending,
}

impl MetricRow {
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Variacao => self.variacao,
            Metric::Oscilacao => self.oscilacao,
        }
    }
}

/// Compute metrics for every data row of `pivot` between `min_year` and
/// `max_year`, both of which must be columns of the pivot.
pub fn compute_metrics(pivot: &PivotTable, min_year: i32, max_year: i32) -> Result<Vec<MetricRow>> {
    if min_year > max_year {
        return Err(ReportError::InvalidYearRange {
            min: min_year,
            max: max_year,
        });
    }
    let min_col = pivot
        .year_index(min_year)
        .ok_or(ReportError::MissingYearColumn { year: min_year })?;
    let max_col = pivot
        .year_index(max_year)
        .ok_or(ReportError::MissingYearColumn { year: max_year })?;

    // Pivot years are sorted, so the delta window is a contiguous slice of columns.
    let window: Vec<usize> = (min_col..=max_col).collect();

    let rows = pivot
        .data_rows()
        .map(|row| {
            let at = |col: usize| row.values[col];
            let variacao = at(max_col) - at(min_col);
            // Peak over every pivot year before the endpoint, not just the window.
            // A single-year range has nothing to oscillate against.
            let oscilacao = if min_col == max_col {
                0.0
            } else {
                let prior_peak = (0..max_col)
                    .map(at)
                    .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
                at(max_col) - prior_peak.unwrap_or(at(min_col))
            };
            let deltas = window
                .windows(2)
                .map(|w| YearDelta {
                    year: pivot.years[w[1]],
                    delta: at(w[1]) - at(w[0]),
                })
                .collect();
            MetricRow {
                key: row.key.clone(),
                values: row.values.clone(),
                deltas,
                variacao,
                oscilacao,
            }
        })
        .collect();
    Ok(rows)
}

/// The first `n` rows ordered by `metric`. Stable: tied rows keep their
/// relative input order.
pub fn top_n(rows: &[MetricRow], metric: Metric, n: usize, order: SortOrder) -> Vec<MetricRow> {
    let mut ranked: Vec<&MetricRow> = rows.iter().collect();
    ranked.sort_by(|a, b| {
        let (x, y) = (a.metric(metric), b.metric(metric));
        let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
    ranked.into_iter().take(n).cloned().collect()
}
