use crate::config::DashboardConfig;
use crate::error::Result;
use crate::filter::{self, FilterSpec, SelectionMode, YearFilter};
use crate::format::{Cell, DecimalPolicy, DisplayTable, LocaleFormatter};
use crate::metrics::{compute_metrics, top_n, Metric, MetricRow, SortOrder};
use crate::pivot::{aggregate, PivotSpec, PivotTable, RowOrder, SeriesPoint};
use crate::store::RecordStore;
use crate::totals::with_totals;
use crate::types::{DecreaseRow, Field, OvertimeRow};
use std::collections::BTreeSet;
use tracing::info;

/// Either a computed dashboard or the notice to show instead of one.
#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard<T> {
    NeedsSelection(String),
    Ready(T),
}

impl<T> Dashboard<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Dashboard::Ready(t) => Some(t),
            Dashboard::NeedsSelection(_) => None,
        }
    }
}

const SELECT_PARAMETERS: &str = "Por favor, selecione os parâmetros para visualizar os dados.";

/// Configuration plus the formatter built from it; shared by every dashboard.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub config: DashboardConfig,
    pub formatter: LocaleFormatter,
}

impl ReportContext {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let formatter = LocaleFormatter::new(config.locale)?;
        Ok(ReportContext { config, formatter })
    }

    fn filter(&self, years: YearFilter, departments: &BTreeSet<String>) -> FilterSpec {
        FilterSpec::new(years, self.config.selection_mode).departments(departments.iter().cloned())
    }
}

fn department_label(departments: &BTreeSet<String>) -> String {
    if departments.is_empty() {
        "todas as secretarias".to_string()
    } else {
        departments.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeParams {
    pub departments: BTreeSet<String>,
    pub min_year: i32,
    pub max_year: i32,
}

impl RangeParams {
    pub fn new(department: impl Into<String>, min_year: i32, max_year: i32) -> Self {
        RangeParams {
            departments: [department.into()].into_iter().collect(),
            min_year,
            max_year,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadcountReport {
    pub title: String,
    /// Role description by year, roles with no servers dropped. Chart input.
    pub chart: PivotTable,
    /// Bar labels: servers per year.
    pub year_totals: Vec<(i32, f64)>,
    /// (Descrição, Código) by year with a totals row.
    pub detail: PivotTable,
}

impl HeadcountReport {
    pub fn series(&self) -> Vec<SeriesPoint> {
        self.chart.series()
    }
}

/// Servers per role and year inside the selected departments.
pub fn headcount_by_role(
    store: &RecordStore,
    params: &RangeParams,
    ctx: &ReportContext,
) -> Result<Dashboard<HeadcountReport>> {
    let spec = ctx.filter(
        YearFilter::Range {
            min: params.min_year,
            max: params.max_year,
        },
        &params.departments,
    );
    let view = filter::apply(store, &spec);
    if view.is_empty() {
        return Ok(Dashboard::NeedsSelection(SELECT_PARAMETERS.to_string()));
    }
    let years = params.min_year..=params.max_year;

    let chart = aggregate(&view, &PivotSpec::count(vec![Field::RoleDescription]).with_years(years.clone()))?
        .table
        .drop_zero_rows();
    let year_totals = chart.year_totals();

    let detail = aggregate(
        &view,
        &PivotSpec::count(vec![Field::RoleDescription, Field::RoleCode])
            .order(RowOrder::Alpha)
            .with_years(years),
    )?
    .table;
    let detail = with_totals(&detail, &ctx.config.total_label);

    info!(roles = chart.rows.len(), "headcount dashboard computed");
    Ok(Dashboard::Ready(HeadcountReport {
        title: format!(
            "Servidores por Cargo na {} ({}-{})",
            department_label(&params.departments),
            params.min_year,
            params.max_year
        ),
        chart,
        year_totals,
        detail,
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclineReport {
    pub title: String,
    /// Rows sorted by variação, largest decrease first.
    pub metrics: Vec<MetricRow>,
    /// Year counts, `Dif_<ano>` deltas, `Maior_Decréscimo` and `Oscilação`.
    pub table: DisplayTable,
    pub ranking: Vec<DecreaseRow>,
}

/// Roles ranked by how much their headcount shrank over the year range.
pub fn decline_ranking(
    store: &RecordStore,
    params: &RangeParams,
    ctx: &ReportContext,
) -> Result<Dashboard<DeclineReport>> {
    let spec = ctx.filter(
        YearFilter::Range {
            min: params.min_year,
            max: params.max_year,
        },
        &params.departments,
    );
    let view = filter::apply(store, &spec);
    if view.is_empty() {
        return Ok(Dashboard::NeedsSelection(SELECT_PARAMETERS.to_string()));
    }

    let pivot = aggregate(
        &view,
        &PivotSpec::count(vec![Field::RoleDescription, Field::RoleCode])
            .order(RowOrder::Alpha)
            .with_years(params.min_year..=params.max_year),
    )?
    .table;
    let metrics = compute_metrics(&pivot, params.min_year, params.max_year)?;
    let metrics = top_n(&metrics, Metric::Variacao, metrics.len(), SortOrder::Ascending);

    let mut headers: Vec<String> = pivot.key_fields.iter().map(|f| f.header().to_string()).collect();
    headers.extend(pivot.years.iter().map(|y| y.to_string()));
    headers.extend(pivot.years.iter().skip(1).map(|y| format!("Dif_{}", y)));
    headers.push("Maior_Decréscimo".to_string());
    headers.push("Oscilação".to_string());

    let rows = metrics
        .iter()
        .map(|m| {
            let mut cells: Vec<Cell> = m.key.iter().map(|k| Cell::Text(k.clone())).collect();
            cells.extend(m.values.iter().map(|v| Cell::Number(*v)));
            cells.extend(m.deltas.iter().map(|d| Cell::Number(d.delta)));
            cells.push(Cell::Number(m.variacao));
            cells.push(Cell::Number(m.oscilacao));
            cells
        })
        .collect();

    let ranking = metrics
        .iter()
        .map(|m| DecreaseRow {
            description: m.key[0].clone(),
            code: m.key[1].clone(),
            decrease: ctx.formatter.format(m.variacao),
        })
        .collect();

    Ok(Dashboard::Ready(DeclineReport {
        title: format!(
            "Cargos com Maior Decréscimo no Quadro Funcional ({}-{})",
            params.min_year, params.max_year
        ),
        metrics,
        table: DisplayTable { headers, rows },
        ranking,
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvertimeParams {
    pub years: BTreeSet<i32>,
    pub departments: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OvertimeReport {
    pub title: String,
    /// (Cod_Cargo, Cargo) by year, sorted by total hours descending.
    pub pivot: PivotTable,
    /// The first `top_n` roles, for the bar chart.
    pub top: PivotTable,
    pub rows: Vec<OvertimeRow>,
    /// Hour values that could not be summed.
    pub skipped_rows: usize,
}

impl OvertimeReport {
    /// `(role, total hours)` bars of the top roles.
    pub fn bars(&self) -> Vec<(String, f64)> {
        self.top
            .data_rows()
            .map(|r| (r.key.get(1).cloned().unwrap_or_default(), r.total()))
            .collect()
    }
}

fn overtime_notice(params: &OvertimeParams) -> Option<&'static str> {
    match (params.years.is_empty(), params.departments.is_empty()) {
        (true, true) => Some("Por favor, selecione ao menos um ano e uma secretaria para visualizar os dados."),
        (true, false) => Some("Por favor, selecione ao menos um ano para visualizar os dados."),
        (false, true) => Some("Por favor, selecione ao menos uma secretaria para visualizar os dados."),
        (false, false) => None,
    }
}

/// Overtime hours per role over the selected years and departments.
pub fn overtime_ranking(
    store: &RecordStore,
    params: &OvertimeParams,
    ctx: &ReportContext,
) -> Result<Dashboard<OvertimeReport>> {
    if ctx.config.selection_mode == SelectionMode::RequireSelection {
        if let Some(notice) = overtime_notice(params) {
            return Ok(Dashboard::NeedsSelection(notice.to_string()));
        }
    }
    let spec = ctx.filter(YearFilter::Only(params.years.clone()), &params.departments);
    let view = filter::apply(store, &spec);
    if view.is_empty() {
        return Ok(Dashboard::NeedsSelection(SELECT_PARAMETERS.to_string()));
    }

    let aggregated = aggregate(
        &view,
        &PivotSpec::sum(vec![Field::RoleCode, Field::RoleDescription], Field::HoursWorked)
            .order(RowOrder::ByTotalDesc),
    )?;
    let pivot = aggregated.table;
    let top = pivot.head(ctx.config.top_n);
    let policy = DecimalPolicy::Fixed(ctx.config.hours_decimals);
    let rows = pivot
        .data_rows()
        .map(|r| OvertimeRow {
            code: r.key[0].clone(),
            role: r.key[1].clone(),
            hours: ctx.formatter.format_with(r.total(), policy),
        })
        .collect();

    let years: Vec<String> = params.years.iter().map(|y| y.to_string()).collect();
    Ok(Dashboard::Ready(OvertimeReport {
        title: format!(
            "Horas Extras realizadas na {} em {}",
            department_label(&params.departments),
            if years.is_empty() { "todos os anos".to_string() } else { years.join(", ") }
        ),
        pivot,
        top,
        rows,
        skipped_rows: aggregated.skipped_rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DatasetKind, Record, Schema};

    fn ctx() -> ReportContext {
        ReportContext::new(DashboardConfig::default()).unwrap()
    }

    fn headcount_store() -> RecordStore {
        RecordStore::new(
            Schema::for_kind(DatasetKind::Headcount, false, false),
            vec![
                Record::new("Saúde", "R1", "Enfermeiro", 2020),
                Record::new("Saúde", "R1", "Enfermeiro", 2020),
                Record::new("Saúde", "R1", "Enfermeiro", 2021),
                Record::new("Saúde", "R2", "Agente", 2020),
                Record::new("Saúde", "R2", "Agente", 2021),
                Record::new("Saúde", "R2", "Agente", 2021),
                Record::new("Educação", "R3", "Professor", 2021),
            ],
        )
    }

    #[test]
    fn headcount_builds_chart_and_detail() {
        let store = headcount_store();
        let report = headcount_by_role(&store, &RangeParams::new("Saúde", 2020, 2021), &ctx())
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(report.title, "Servidores por Cargo na Saúde (2020-2021)");
        assert_eq!(report.year_totals, vec![(2020, 3.0), (2021, 3.0)]);
        assert_eq!(report.chart.rows.len(), 2);
        // Alphabetical detail rows, then the totals row.
        assert_eq!(report.detail.rows[0].key, vec!["Agente", "R2"]);
        let total = report.detail.rows.last().unwrap();
        assert_eq!(total.key, vec!["TOTAL", ""]);
        assert_eq!(total.values, vec![3.0, 3.0]);
        assert_eq!(report.series().len(), 4);
    }

    #[test]
    fn headcount_without_department_needs_selection() {
        let store = headcount_store();
        let params = RangeParams {
            departments: BTreeSet::new(),
            min_year: 2020,
            max_year: 2021,
        };
        let out = headcount_by_role(&store, &params, &ctx()).unwrap();
        assert!(matches!(out, Dashboard::NeedsSelection(_)));
    }

    #[test]
    fn decline_sorts_largest_decrease_first() {
        let store = headcount_store();
        let report = decline_ranking(&store, &RangeParams::new("Saúde", 2020, 2021), &ctx())
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(report.metrics[0].key, vec!["Enfermeiro", "R1"]);
        assert_eq!(report.metrics[0].variacao, -1.0);
        assert_eq!(report.metrics[1].variacao, 1.0);
        assert_eq!(
            report.table.headers,
            vec!["Descrição", "Código", "2020", "2021", "Dif_2021", "Maior_Decréscimo", "Oscilação"]
        );
        assert_eq!(report.ranking[0].decrease, "-1");
    }

    #[test]
    fn overtime_reports_specific_notices() {
        let store = headcount_store();
        let params = OvertimeParams {
            years: BTreeSet::new(),
            departments: BTreeSet::new(),
        };
        match overtime_ranking(&store, &params, &ctx()).unwrap() {
            Dashboard::NeedsSelection(msg) => assert!(msg.contains("um ano e uma secretaria")),
            Dashboard::Ready(_) => panic!("expected a notice"),
        }
    }

    #[test]
    fn overtime_ranks_by_hours() {
        let store = RecordStore::new(
            Schema::for_kind(DatasetKind::Overtime, false, true),
            vec![
                Record::new("Saúde", "10", "Médico", 2023).with_hours(1200.5),
                Record::new("Saúde", "20", "Motorista", 2023).with_hours(3000.0),
                Record::new("Saúde", "10", "Médico", 2024).with_hours(100.0),
                Record::new("Obras", "30", "Engenheiro", 2023).with_hours(50.0),
            ],
        );
        let params = OvertimeParams {
            years: [2023, 2024].into_iter().collect(),
            departments: ["Saúde".to_string()].into_iter().collect(),
        };
        let report = overtime_ranking(&store, &params, &ctx()).unwrap().ready().unwrap();
        assert_eq!(report.title, "Horas Extras realizadas na Saúde em 2023, 2024");
        assert_eq!(report.rows[0].role, "Motorista");
        assert_eq!(report.rows[0].hours, "3.000,00");
        assert_eq!(report.rows[1].hours, "1.300,50");
        assert_eq!(report.bars()[1], ("Médico".to_string(), 1300.5));
    }
}
