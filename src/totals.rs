use crate::pivot::{PivotRow, PivotTable};

pub const DEFAULT_TOTAL_LABEL: &str = "TOTAL";

/// Copy of `pivot` with a column-sum row appended.
///
/// The first key column of the new row holds `total_label`, the remaining
/// key columns are blank. Existing totals rows are not summed again. The
/// input is left untouched so it can still feed a chart.
///
/// The category label columns are not passed in: they are the pivot's own
/// `key_fields`, so the totals row always has the same key width as the
/// data rows.
pub fn with_totals(pivot: &PivotTable, total_label: &str) -> PivotTable {
    let mut sums = vec![0.0; pivot.years.len()];
    for row in pivot.data_rows() {
        for (acc, v) in sums.iter_mut().zip(&row.values) {
            *acc += v;
        }
    }

    let width = pivot.key_fields.len().max(1);
    let mut key = vec![String::new(); width];
    key[0] = total_label.to_string();

    let mut out = pivot.clone();
    out.rows.push(PivotRow {
        key,
        values: sums,
        is_total: true,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::AggFn;
    use crate::types::Field;

    fn pivot() -> PivotTable {
        PivotTable {
            key_fields: vec![Field::RoleDescription, Field::RoleCode],
            years: vec![2020, 2021],
            rows: vec![
                PivotRow {
                    key: vec!["Enfermeiro".into(), "R1".into()],
                    values: vec![1.0, 3.0],
                    is_total: false,
                },
                PivotRow {
                    key: vec!["Médico".into(), "R2".into()],
                    values: vec![0.0, 1.0],
                    is_total: false,
                },
            ],
            agg: AggFn::Count,
        }
    }

    #[test]
    fn appends_column_sums_with_label() {
        let p = pivot();
        let t = with_totals(&p, DEFAULT_TOTAL_LABEL);
        assert_eq!(t.rows.len(), 3);
        let total = t.rows.last().unwrap();
        assert!(total.is_total);
        assert_eq!(total.key, vec!["TOTAL".to_string(), String::new()]);
        assert_eq!(total.values, vec![1.0, 4.0]);
    }

    #[test]
    fn input_is_not_mutated_and_series_skip_totals() {
        let p = pivot();
        let t = with_totals(&p, "Total geral");
        assert_eq!(p.rows.len(), 2);
        assert_eq!(t.series(), p.series());
    }

    #[test]
    fn totals_are_not_double_counted() {
        let p = pivot();
        let twice = with_totals(&with_totals(&p, "TOTAL"), "TOTAL");
        assert_eq!(twice.rows.last().unwrap().values, vec![1.0, 4.0]);
    }

    #[test]
    fn empty_pivot_gets_zero_row() {
        let mut p = pivot();
        p.rows.clear();
        let t = with_totals(&p, "TOTAL");
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].values, vec![0.0, 0.0]);
    }

    #[test]
    fn label_columns_follow_pivot_key_fields() {
        let mut p = pivot();
        p.key_fields.insert(0, Field::Department);
        for row in &mut p.rows {
            row.key.insert(0, "Saúde".into());
        }
        let t = with_totals(&p, "TOTAL");
        assert_eq!(
            t.rows.last().unwrap().key,
            vec!["TOTAL".to_string(), String::new(), String::new()]
        );
    }
}
