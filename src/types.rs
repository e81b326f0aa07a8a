use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tabled::Tabled;

/// One spreadsheet row as it comes out of the file, before any validation.
///
/// The two dataset variants reuse the `Cargo` header with different meanings:
/// in the headcount sheet it holds the role code, in the overtime sheet the
/// role description (the code lives in `Cod_Cargo`).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Secretaria")]
    pub secretaria: Option<String>,
    #[serde(rename = "Ano")]
    pub ano: Option<String>,
    #[serde(rename = "Mes")]
    pub mes: Option<String>,
    #[serde(rename = "Cargo")]
    pub cargo: Option<String>,
    #[serde(rename = "Descrição_Cargo")]
    pub descricao_cargo: Option<String>,
    #[serde(rename = "Cod_Cargo")]
    pub cod_cargo: Option<String>,
    #[serde(rename = "Matricula")]
    pub matricula: Option<String>,
    #[serde(rename = "Horas_realizadas")]
    pub horas_realizadas: Option<String>,
}

/// A validated personnel record. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub department: String,
    pub role_code: String,
    pub role_description: String,
    pub year: i32,
    pub month: Option<u8>,
    pub employee_id: Option<String>,
    pub hours_worked: Option<f64>,
}

impl Record {
    pub fn new(
        department: impl Into<String>,
        role_code: impl Into<String>,
        role_description: impl Into<String>,
        year: i32,
    ) -> Self {
        Record {
            department: department.into(),
            role_code: role_code.into(),
            role_description: role_description.into(),
            year,
            month: None,
            employee_id: None,
            hours_worked: None,
        }
    }

    pub fn with_month(mut self, month: u8) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours_worked = Some(hours);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Categorical,
    Numeric,
    Year,
}

impl FieldKind {
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Categorical => "categorical",
            FieldKind::Numeric => "numeric",
            FieldKind::Year => "year",
        }
    }
}

/// Addressable columns of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Department,
    RoleCode,
    RoleDescription,
    Year,
    Month,
    EmployeeId,
    HoursWorked,
}

impl Field {
    pub fn kind(self) -> FieldKind {
        match self {
            Field::Year => FieldKind::Year,
            Field::HoursWorked => FieldKind::Numeric,
            _ => FieldKind::Categorical,
        }
    }

    /// Column header used in rendered tables.
    pub fn header(self) -> &'static str {
        match self {
            Field::Department => "Secretaria",
            Field::RoleCode => "Código",
            Field::RoleDescription => "Descrição",
            Field::Year => "Ano",
            Field::Month => "Mês",
            Field::EmployeeId => "Matrícula",
            Field::HoursWorked => "Horas_realizadas",
        }
    }

    /// Categorical value of this field for `record`, `None` when absent.
    pub fn text<'a>(self, record: &'a Record) -> Option<Cow<'a, str>> {
        match self {
            Field::Department => Some(Cow::Borrowed(record.department.as_str())),
            Field::RoleCode => Some(Cow::Borrowed(record.role_code.as_str())),
            Field::RoleDescription => Some(Cow::Borrowed(record.role_description.as_str())),
            Field::Year => Some(Cow::Owned(record.year.to_string())),
            Field::Month => record.month.map(|m| Cow::Owned(m.to_string())),
            Field::EmployeeId => record.employee_id.as_deref().map(Cow::Borrowed),
            Field::HoursWorked => None,
        }
    }

    /// Numeric value of this field for `record`, `None` when absent or non-numeric.
    pub fn number(self, record: &Record) -> Option<f64> {
        match self {
            Field::HoursWorked => record.hours_worked.filter(|h| h.is_finite()),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Headcount,
    Overtime,
}

impl DatasetKind {
    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::Headcount => "headcount",
            DatasetKind::Overtime => "overtime",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Headcount => &["Secretaria", "Ano", "Cargo", "Descrição_Cargo"],
            DatasetKind::Overtime => &[
                "Ano",
                "Matricula",
                "Secretaria",
                "Cod_Cargo",
                "Cargo",
                "Horas_realizadas",
            ],
        }
    }
}

/// Fields actually present in a loaded dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub kind: DatasetKind,
    pub fields: Vec<Field>,
}

impl Schema {
    /// Schema implied by the required columns of `kind` plus any optional columns found.
    pub fn for_kind(kind: DatasetKind, has_month: bool, has_employee: bool) -> Self {
        let mut fields = vec![
            Field::Department,
            Field::RoleCode,
            Field::RoleDescription,
            Field::Year,
        ];
        if has_month {
            fields.push(Field::Month);
        }
        if has_employee || kind == DatasetKind::Overtime {
            fields.push(Field::EmployeeId);
        }
        if kind == DatasetKind::Overtime {
            fields.push(Field::HoursWorked);
        }
        Schema { kind, fields }
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

/// Compact decline ranking row ("Cargos com Maior Decréscimo").
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DecreaseRow {
    #[serde(rename = "Descrição")]
    #[tabled(rename = "Descrição")]
    pub description: String,
    #[serde(rename = "Código")]
    #[tabled(rename = "Código")]
    pub code: String,
    #[serde(rename = "Maior_Decréscimo")]
    #[tabled(rename = "Maior_Decréscimo")]
    pub decrease: String,
}

/// Overtime hours per role, already formatted for display.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct OvertimeRow {
    #[serde(rename = "Cod_Cargo")]
    #[tabled(rename = "Cod_Cargo")]
    pub code: String,
    #[serde(rename = "Cargo")]
    #[tabled(rename = "Cargo")]
    pub role: String,
    #[serde(rename = "Horas_realizadas")]
    #[tabled(rename = "Horas_realizadas")]
    pub hours: String,
}
