// Year-indexed pivot of counts or sums over a filtered view.
//
// One row per distinct combination of the grouping fields, one column per
// year. Absent `(key, year)` pairs read as zero. Row order is first-seen
// unless a `RowOrder` asks for a sort.

use crate::error::{ReportError, Result};
use crate::filter::FilteredView;
use crate::format::{Cell, DisplayTable};
use crate::types::{Field, FieldKind, Schema};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggFn {
    Count,
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    FirstSeen,
    /// Descending by the value in the given year column.
    ByValueDesc(i32),
    /// Descending by the row's sum across all years.
    ByTotalDesc,
    /// Ascending by category key.
    Alpha,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotSpec {
    pub group_keys: Vec<Field>,
    pub value_field: Option<Field>,
    pub agg: AggFn,
    pub order: RowOrder,
    /// Year columns that must appear even when no record falls in them.
    pub years: Option<Vec<i32>>,
}

impl PivotSpec {
    pub fn count(group_keys: Vec<Field>) -> Self {
        PivotSpec {
            group_keys,
            value_field: None,
            agg: AggFn::Count,
            order: RowOrder::FirstSeen,
            years: None,
        }
    }

    pub fn sum(group_keys: Vec<Field>, value_field: Field) -> Self {
        PivotSpec {
            group_keys,
            value_field: Some(value_field),
            agg: AggFn::Sum,
            order: RowOrder::FirstSeen,
            years: None,
        }
    }

    pub fn order(mut self, order: RowOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.years = Some(years.into_iter().collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub key: Vec<String>,
    /// Aligned with [`PivotTable::years`].
    pub values: Vec<f64>,
    pub is_total: bool,
}

impl PivotRow {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Key fields joined for use as a chart legend label.
    pub fn label(&self) -> String {
        self.key
            .iter()
            .filter(|k| !k.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub key_fields: Vec<Field>,
    pub years: Vec<i32>,
    pub rows: Vec<PivotRow>,
    pub agg: AggFn,
}

/// One `(category, year) -> value` point for a chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub category: String,
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub table: PivotTable,
    /// Rows whose value field was missing or non-numeric during a SUM.
    pub skipped_rows: usize,
}

pub fn aggregate(view: &FilteredView<'_>, spec: &PivotSpec) -> Result<Aggregated> {
    validate(view.schema, spec)?;

    let mut years: BTreeSet<i32> = view.records.iter().map(|r| r.year).collect();
    if let Some(extra) = &spec.years {
        years.extend(extra.iter().copied());
    }
    let years: Vec<i32> = years.into_iter().collect();
    let year_pos: HashMap<i32, usize> = years.iter().enumerate().map(|(i, y)| (*y, i)).collect();

    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut rows: Vec<PivotRow> = Vec::new();
    let mut skipped_rows = 0usize;

    for record in &view.records {
        let key: Vec<String> = spec
            .group_keys
            .iter()
            .map(|f| f.text(record).map(|v| v.into_owned()).unwrap_or_default())
            .collect();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            rows.push(PivotRow {
                key,
                values: vec![0.0; years.len()],
                is_total: false,
            });
            rows.len() - 1
        });

        let amount = match (spec.agg, spec.value_field) {
            (AggFn::Count, _) => Some(1.0),
            (AggFn::Sum, Some(field)) => field.number(record),
            (AggFn::Sum, None) => None,
        };
        match (amount, year_pos.get(&record.year)) {
            (Some(v), Some(&col)) => rows[slot].values[col] += v,
            _ => skipped_rows += 1,
        }
    }

    if skipped_rows > 0 {
        debug!(skipped_rows, "rows excluded from sum");
    }

    let mut table = PivotTable {
        key_fields: spec.group_keys.clone(),
        years,
        rows,
        agg: spec.agg,
    };
    table.sort(spec.order)?;
    Ok(Aggregated {
        table,
        skipped_rows,
    })
}

fn validate(schema: &Schema, spec: &PivotSpec) -> Result<()> {
    for field in &spec.group_keys {
        if field.kind() != FieldKind::Categorical || !schema.contains(*field) {
            return Err(ReportError::InvalidFieldKind {
                field: field.header().to_string(),
                expected: FieldKind::Categorical.label(),
            });
        }
    }
    if spec.agg == AggFn::Sum {
        match spec.value_field {
            Some(field) if field.kind() == FieldKind::Numeric && schema.contains(field) => {}
            Some(field) => {
                return Err(ReportError::InvalidFieldKind {
                    field: field.header().to_string(),
                    expected: FieldKind::Numeric.label(),
                })
            }
            None => {
                return Err(ReportError::InvalidFieldKind {
                    field: "(none)".to_string(),
                    expected: FieldKind::Numeric.label(),
                })
            }
        }
    }
    Ok(())
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn year_index(&self, year: i32) -> Option<usize> {
        self.years.iter().position(|y| *y == year)
    }

    pub fn value(&self, row: &PivotRow, year: i32) -> Option<f64> {
        self.year_index(year).and_then(|i| row.values.get(i).copied())
    }

    pub fn row(&self, key: &[&str]) -> Option<&PivotRow> {
        self.rows
            .iter()
            .find(|r| !r.is_total && r.key.iter().map(String::as_str).eq(key.iter().copied()))
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().filter(|r| !r.is_total)
    }

    /// Stable sort of the data rows; ties keep first-seen order.
    pub fn sort(&mut self, order: RowOrder) -> Result<()> {
        // An empty selection has no year columns to look up.
        if self.rows.is_empty() {
            return Ok(());
        }
        match order {
            RowOrder::FirstSeen => {}
            RowOrder::ByValueDesc(year) => {
                let col = self
                    .year_index(year)
                    .ok_or(ReportError::MissingYearColumn { year })?;
                self.rows
                    .sort_by(|a, b| b.values[col].partial_cmp(&a.values[col]).unwrap_or(Ordering::Equal));
            }
            RowOrder::ByTotalDesc => {
                self.rows
                    .sort_by(|a, b| b.total().partial_cmp(&a.total()).unwrap_or(Ordering::Equal));
            }
            RowOrder::Alpha => self.rows.sort_by(|a, b| a.key.cmp(&b.key)),
        }
        Ok(())
    }

    /// Column sums over data rows, for the per-bar labels of a stacked chart.
    pub fn year_totals(&self) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .enumerate()
            .map(|(i, y)| (*y, self.data_rows().map(|r| r.values[i]).sum()))
            .collect()
    }

    /// Copy without year columns whose data rows are all zero.
    pub fn drop_zero_years(&self) -> PivotTable {
        let keep: Vec<usize> = (0..self.years.len())
            .filter(|&i| self.data_rows().any(|r| r.values[i] != 0.0))
            .collect();
        PivotTable {
            key_fields: self.key_fields.clone(),
            years: keep.iter().map(|&i| self.years[i]).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| PivotRow {
                    key: r.key.clone(),
                    values: keep.iter().map(|&i| r.values[i]).collect(),
                    is_total: r.is_total,
                })
                .collect(),
            agg: self.agg,
        }
    }

    /// Copy without categories that are zero in every year.
    pub fn drop_zero_rows(&self) -> PivotTable {
        PivotTable {
            key_fields: self.key_fields.clone(),
            years: self.years.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r.is_total || r.values.iter().any(|v| *v != 0.0))
                .cloned()
                .collect(),
            agg: self.agg,
        }
    }

    /// Keep only the first `n` data rows.
    pub fn head(&self, n: usize) -> PivotTable {
        PivotTable {
            key_fields: self.key_fields.clone(),
            years: self.years.clone(),
            rows: self.data_rows().take(n).cloned().collect(),
            agg: self.agg,
        }
    }

    /// Flat chart input. Totals rows never appear in a series.
    pub fn series(&self) -> Vec<SeriesPoint> {
        self.data_rows()
            .flat_map(|row| {
                let category = row.label();
                self.years
                    .iter()
                    .zip(row.values.iter())
                    .map(move |(year, value)| SeriesPoint {
                        category: category.clone(),
                        year: *year,
                        value: *value,
                    })
            })
            .collect()
    }

    /// Tabular form: one column per key field followed by one per year.
    pub fn to_display(&self) -> DisplayTable {
        let mut headers: Vec<String> = self.key_fields.iter().map(|f| f.header().to_string()).collect();
        headers.extend(self.years.iter().map(|y| y.to_string()));
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut cells: Vec<Cell> = r
                    .key
                    .iter()
                    .map(|k| if k.is_empty() { Cell::Blank } else { Cell::Text(k.clone()) })
                    .collect();
                cells.extend(r.values.iter().map(|v| Cell::Number(*v)));
                cells
            })
            .collect();
        DisplayTable { headers, rows }
    }
}
