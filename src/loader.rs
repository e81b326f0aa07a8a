use crate::error::{ReportError, Result};
use crate::store::RecordStore;
use crate::types::{DatasetKind, RawRow, Record, Schema};
use crate::util::{cell_to_string, non_blank, parse_f64_safe, parse_i32_safe, parse_month_safe};
use calamine::{Reader, Xlsx};
use csv::{ReaderBuilder, Trim};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    /// Hour values present in the file but not numeric; kept as absent.
    pub coerced_hours: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(SourceFormat::Csv),
            Some("xlsx") => Ok(SourceFormat::Xlsx),
            _ => Err(ReportError::UnsupportedFile(path.display().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    /// Force a dataset variant instead of detecting it from the headers.
    pub kind: Option<DatasetKind>,
    pub sheet_name: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            kind: None,
            sheet_name: "base".to_string(),
        }
    }
}

pub fn load_path(path: &Path, opts: &LoadOptions) -> Result<(RecordStore, LoadReport)> {
    let format = SourceFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    load_bytes(&bytes, format, opts)
}

/// Parse and validate a dataset held in memory.
pub fn load_bytes(
    bytes: &[u8],
    format: SourceFormat,
    opts: &LoadOptions,
) -> Result<(RecordStore, LoadReport)> {
    let (headers, rows) = match format {
        SourceFormat::Csv => read_csv(bytes)?,
        SourceFormat::Xlsx => read_xlsx(bytes, &opts.sheet_name)?,
    };
    let kind = opts.kind.unwrap_or_else(|| detect_kind(&headers));
    validate_headers(&headers, kind)?;

    let schema = Schema::for_kind(
        kind,
        headers.iter().any(|h| h == "Mes"),
        headers.iter().any(|h| h == "Matricula"),
    );
    let (store, report) = clean_rows(rows, schema);
    info!(
        dataset = kind.label(),
        total = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.parse_errors,
        "dataset loaded"
    );
    Ok((store, report))
}

fn detect_kind(headers: &[String]) -> DatasetKind {
    if headers.iter().any(|h| h == "Horas_realizadas") {
        DatasetKind::Overtime
    } else {
        DatasetKind::Headcount
    }
}

fn validate_headers(headers: &[String], kind: DatasetKind) -> Result<()> {
    for column in kind.required_columns() {
        if !headers.iter().any(|h| h == column) {
            return Err(ReportError::SchemaViolation {
                column: column.to_string(),
                dataset: kind.label(),
            });
        }
    }
    Ok(())
}

// Rows that fail to deserialize come back as `None` and are counted later.
type RawRows = Vec<Option<RawRow>>;

fn read_csv(bytes: &[u8]) -> Result<(Vec<String>, RawRows)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(bytes);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let rows = rdr.deserialize::<RawRow>().map(|r| r.ok()).collect();
    Ok((headers, rows))
}

fn read_xlsx(bytes: &[u8], sheet: &str) -> Result<(Vec<String>, RawRows)> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook.worksheet_range(sheet)?;
    let mut iter = range.rows();
    let headers: Vec<String> = match iter.next() {
        Some(row) => row
            .iter()
            .map(|c| cell_to_string(c).unwrap_or_default().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let column = |name: &str| headers.iter().position(|h| h == name);
    let cols = [
        column("Secretaria"),
        column("Ano"),
        column("Mes"),
        column("Cargo"),
        column("Descrição_Cargo"),
        column("Cod_Cargo"),
        column("Matricula"),
        column("Horas_realizadas"),
    ];
    let rows = iter
        .map(|row| {
            let get = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(cell_to_string);
            Some(RawRow {
                secretaria: get(cols[0]),
                ano: get(cols[1]),
                mes: get(cols[2]),
                cargo: get(cols[3]),
                descricao_cargo: get(cols[4]),
                cod_cargo: get(cols[5]),
                matricula: get(cols[6]),
                horas_realizadas: get(cols[7]),
            })
        })
        .collect();
    Ok((headers, rows))
}

fn clean_rows(rows: RawRows, schema: Schema) -> (RecordStore, LoadReport) {
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut coerced_hours = 0usize;
    let mut records: Vec<Record> = Vec::new();

    for row in rows {
        total_rows += 1;
        let Some(row) = row else {
            parse_errors += 1;
            continue;
        };

        let year = match parse_i32_safe(row.ano.as_deref()) {
            Some(y) => y,
            None => {
                parse_errors += 1;
                continue;
            }
        };
        let Some(department) = non_blank(row.secretaria) else {
            parse_errors += 1;
            continue;
        };

        let (code, description) = match schema.kind {
            DatasetKind::Headcount => (row.cargo, row.descricao_cargo),
            DatasetKind::Overtime => (row.cod_cargo, row.cargo),
        };
        let Some(role_code) = non_blank(code) else {
            parse_errors += 1;
            continue;
        };
        let role_description = non_blank(description).unwrap_or_default();

        let mut record = Record::new(department, role_code, role_description, year);
        record.month = parse_month_safe(row.mes.as_deref());
        record.employee_id = non_blank(row.matricula);
        if schema.kind == DatasetKind::Overtime {
            record.hours_worked = parse_f64_safe(row.horas_realizadas.as_deref());
            if record.hours_worked.is_none() && non_blank(row.horas_realizadas).is_some() {
                coerced_hours += 1;
            }
        }
        records.push(record);
    }

    if coerced_hours > 0 {
        debug!(coerced_hours, "non-numeric hour values treated as absent");
    }
    let report = LoadReport {
        total_rows,
        loaded_rows: records.len(),
        parse_errors,
        coerced_hours,
    };
    (RecordStore::new(schema, records), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;
    use rust_xlsxwriter::Workbook;

    const HEADCOUNT: &str = "Secretaria,Ano,Cargo,Descrição_Cargo\n\
        Saúde,2020,R1,Enfermeiro\n\
        Saúde,2021,R1,Enfermeiro\n\
        Educação,abc,R2,Professor\n\
        ,2021,R2,Professor\n";

    #[test]
    fn headcount_csv_loads_and_skips_bad_rows() {
        let (store, report) =
            load_bytes(HEADCOUNT.as_bytes(), SourceFormat::Csv, &LoadOptions::default()).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(store.schema().kind, DatasetKind::Headcount);
        assert!(!store.schema().contains(Field::HoursWorked));
        assert_eq!(store.records()[0].role_code, "R1");
        assert_eq!(store.records()[0].role_description, "Enfermeiro");
    }

    #[test]
    fn overtime_variant_is_detected_and_hours_coerced() {
        let csv = "Ano,Matricula,Secretaria,Cod_Cargo,Cargo,Horas_realizadas\n\
            2022,001,Saúde,10,Médico,12.5\n\
            2022,002,Saúde,10,Médico,xx\n";
        let (store, report) =
            load_bytes(csv.as_bytes(), SourceFormat::Csv, &LoadOptions::default()).unwrap();
        assert_eq!(store.schema().kind, DatasetKind::Overtime);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.coerced_hours, 1);
        let r = &store.records()[0];
        assert_eq!(r.role_code, "10");
        assert_eq!(r.role_description, "Médico");
        assert_eq!(r.hours_worked, Some(12.5));
        assert_eq!(r.employee_id.as_deref(), Some("001"));
        assert_eq!(store.records()[1].hours_worked, None);
    }

    #[test]
    fn missing_column_is_a_schema_violation() {
        let csv = "Secretaria,Ano,Cargo\nSaúde,2020,R1\n";
        let err = load_bytes(csv.as_bytes(), SourceFormat::Csv, &LoadOptions::default()).unwrap_err();
        match err {
            ReportError::SchemaViolation { column, dataset } => {
                assert_eq!(column, "Descrição_Cargo");
                assert_eq!(dataset, "headcount");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn forced_overtime_kind_requires_hours_column() {
        let opts = LoadOptions {
            kind: Some(DatasetKind::Overtime),
            ..LoadOptions::default()
        };
        let err = load_bytes(HEADCOUNT.as_bytes(), SourceFormat::Csv, &opts).unwrap_err();
        assert!(matches!(err, ReportError::SchemaViolation { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = SourceFormat::from_path(Path::new("base.ods")).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFile(_)));
        assert_eq!(
            SourceFormat::from_path(Path::new("BASE.XLSX")).unwrap(),
            SourceFormat::Xlsx
        );
    }

    // Columns deliberately out of the usual order; numbers stored as floats
    // the way spreadsheet exports keep them.
    fn overtime_workbook(sheet: &str) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name(sheet).unwrap();
        let headers = ["Horas_realizadas", "Ano", "Secretaria", "Cod_Cargo", "Cargo", "Matricula"];
        for (col, header) in headers.iter().enumerate() {
            ws.write_string(0, col as u16, *header).unwrap();
        }

        ws.write_number(1, 0, 12.5).unwrap();
        ws.write_number(1, 1, 2020.0).unwrap();
        ws.write_string(1, 2, "Saúde").unwrap();
        ws.write_number(1, 3, 10.0).unwrap();
        ws.write_string(1, 4, "Médico").unwrap();
        ws.write_number(1, 5, 1234.0).unwrap();

        ws.write_string(2, 0, "n/d").unwrap();
        ws.write_number(2, 1, 2021.0).unwrap();
        ws.write_string(2, 2, "Educação").unwrap();
        ws.write_number(2, 3, 20.0).unwrap();
        ws.write_string(2, 4, "Professor").unwrap();

        // No year: skipped.
        ws.write_number(3, 0, 3.0).unwrap();
        ws.write_string(3, 2, "Saúde").unwrap();
        ws.write_number(3, 3, 10.0).unwrap();
        ws.write_string(3, 4, "Médico").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn xlsx_base_sheet_loads_by_header_name() {
        let bytes = overtime_workbook("base");
        let (store, report) = load_bytes(&bytes, SourceFormat::Xlsx, &LoadOptions::default()).unwrap();

        assert_eq!(store.schema().kind, DatasetKind::Overtime);
        assert!(store.schema().contains(Field::EmployeeId));
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(report.coerced_hours, 1);

        let first = &store.records()[0];
        assert_eq!(first.year, 2020);
        assert_eq!(first.department, "Saúde");
        assert_eq!(first.role_code, "10");
        assert_eq!(first.role_description, "Médico");
        assert_eq!(first.hours_worked, Some(12.5));
        assert_eq!(first.employee_id.as_deref(), Some("1234"));

        let second = &store.records()[1];
        assert_eq!(second.year, 2021);
        assert_eq!(second.role_code, "20");
        assert_eq!(second.hours_worked, None);
        assert_eq!(second.employee_id, None);
    }

    #[test]
    fn xlsx_sheet_name_comes_from_options() {
        let bytes = overtime_workbook("dados");
        let err = load_bytes(&bytes, SourceFormat::Xlsx, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::Xlsx(_)));

        let opts = LoadOptions {
            sheet_name: "dados".to_string(),
            ..LoadOptions::default()
        };
        let (store, _) = load_bytes(&bytes, SourceFormat::Xlsx, &opts).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn xlsx_missing_column_is_a_schema_violation() {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("base").unwrap();
        for (col, header) in ["Secretaria", "Ano", "Cargo"].iter().enumerate() {
            ws.write_string(0, col as u16, *header).unwrap();
        }
        ws.write_string(1, 0, "Saúde").unwrap();
        ws.write_number(1, 1, 2020.0).unwrap();
        ws.write_string(1, 2, "R1").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let err = load_bytes(&bytes, SourceFormat::Xlsx, &LoadOptions::default()).unwrap_err();
        match err {
            ReportError::SchemaViolation { column, dataset } => {
                assert_eq!(column, "Descrição_Cargo");
                assert_eq!(dataset, "headcount");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_bytes_are_not_a_workbook() {
        let err = load_bytes(b"not a zip", SourceFormat::Xlsx, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::Xlsx(_)));
    }
}
