// Aggregation engine behind the personnel dashboards.
//
// Data flows store -> filter -> pivot -> metrics / totals -> format. The
// `reports` module wires those stages into the three dashboards; `loader`,
// `output` and `config` are the edges the binary talks to.
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod pivot;
pub mod reports;
pub mod store;
pub mod totals;
pub mod types;
pub mod util;

pub use error::{ReportError, Result};
pub use filter::{FilterSpec, FilteredView, SelectionMode, YearFilter};
pub use format::{Cell, DecimalPolicy, DisplayTable, LocaleFormatter, NumberLocale};
pub use metrics::{compute_metrics, top_n, Metric, MetricRow, SortOrder};
pub use pivot::{aggregate, AggFn, PivotSpec, PivotTable, RowOrder};
pub use store::{RecordStore, Session};
pub use totals::with_totals;
pub use types::{DatasetKind, Field, Record, Schema};
