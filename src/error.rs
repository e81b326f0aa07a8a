use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("missing required column '{column}' for the {dataset} dataset")]
    SchemaViolation { column: String, dataset: &'static str },

    #[error("field '{field}' cannot be used here: expected a {expected} field")]
    InvalidFieldKind { field: String, expected: &'static str },

    #[error("year {year} is not a column of the pivot table")]
    MissingYearColumn { year: i32 },

    #[error("invalid year range: {min} is after {max}")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX read error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("number format error: {0}")]
    Format(String),
}

impl From<toml::de::Error> for ReportError {
    fn from(e: toml::de::Error) -> Self {
        ReportError::Config(e.to_string())
    }
}

impl From<num_format::Error> for ReportError {
    fn from(e: num_format::Error) -> Self {
        ReportError::Format(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
