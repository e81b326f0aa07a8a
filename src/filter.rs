// Predicate filtering of a record store by department, role and year.
//
// A `FilterSpec` is a plain value built per interaction; `apply` is pure
// and returns a borrowed view over the matching records.

use crate::store::RecordStore;
use crate::types::{Record, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// What an empty department/role/year selection means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Nothing selected means nothing to show.
    #[default]
    RequireSelection,
    /// Nothing selected means no restriction.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearFilter {
    /// Inclusive on both ends. `min > max` matches nothing.
    Range { min: i32, max: i32 },
    /// An explicit multi-selection of years.
    Only(BTreeSet<i32>),
}

impl YearFilter {
    fn matches(&self, year: i32, mode: SelectionMode) -> bool {
        match self {
            YearFilter::Range { min, max } => *min <= year && year <= *max,
            YearFilter::Only(set) => {
                if set.is_empty() {
                    mode == SelectionMode::All
                } else {
                    set.contains(&year)
                }
            }
        }
    }

    fn is_empty_selection(&self) -> bool {
        match self {
            YearFilter::Range { min, max } => min > max,
            YearFilter::Only(set) => set.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub departments: BTreeSet<String>,
    pub years: YearFilter,
    /// Role codes. `None` disables role filtering regardless of mode.
    pub roles: Option<BTreeSet<String>>,
    pub mode: SelectionMode,
}

impl FilterSpec {
    pub fn new(years: YearFilter, mode: SelectionMode) -> Self {
        FilterSpec {
            departments: BTreeSet::new(),
            years,
            roles: None,
            mode,
        }
    }

    pub fn year_range(min: i32, max: i32, mode: SelectionMode) -> Self {
        Self::new(YearFilter::Range { min, max }, mode)
    }

    pub fn department(mut self, name: impl Into<String>) -> Self {
        self.departments.insert(name.into());
        self
    }

    pub fn departments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.departments.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn roles<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .get_or_insert_with(BTreeSet::new)
            .extend(codes.into_iter().map(Into::into));
        self
    }

    /// True when the selection is guaranteed to match no record.
    pub fn selects_nothing(&self) -> bool {
        if self.years.is_empty_selection() && !matches!(self.years, YearFilter::Only(_)) {
            return true;
        }
        if self.mode == SelectionMode::All {
            return false;
        }
        self.departments.is_empty()
            || self.years.is_empty_selection()
            || self.roles.as_ref().is_some_and(|r| r.is_empty())
    }

    pub fn matches(&self, record: &Record) -> bool {
        let dept_ok = if self.departments.is_empty() {
            self.mode == SelectionMode::All
        } else {
            self.departments.contains(&record.department)
        };
        let role_ok = match &self.roles {
            None => true,
            Some(roles) if roles.is_empty() => self.mode == SelectionMode::All,
            Some(roles) => roles.contains(&record.role_code),
        };
        dept_ok && role_ok && self.years.matches(record.year, self.mode)
    }
}

/// Records that passed a filter, borrowed from their store.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub schema: &'a Schema,
    pub records: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    /// Unfiltered view over every record.
    pub fn all(store: &'a RecordStore) -> Self {
        FilteredView {
            schema: store.schema(),
            records: store.records().iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn apply<'a>(store: &'a RecordStore, spec: &FilterSpec) -> FilteredView<'a> {
    let records: Vec<&Record> = if spec.selects_nothing() {
        Vec::new()
    } else {
        store.records().iter().filter(|r| spec.matches(r)).collect()
    };
    debug!(
        matched = records.len(),
        total = store.len(),
        "filter applied"
    );
    FilteredView {
        schema: store.schema(),
        records,
    }
}

/// Distinct departments in alphabetical order, for selection widgets.
pub fn distinct_departments(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.department.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct years, ascending.
pub fn distinct_years(records: &[Record]) -> Vec<i32> {
    records
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct `(code, description)` pairs, ordered by code.
pub fn distinct_roles(records: &[Record]) -> Vec<(String, String)> {
    records
        .iter()
        .map(|r| (r.role_code.clone(), r.role_description.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// First and last year present, the default bounds of a range selector.
pub fn default_year_range(records: &[Record]) -> Option<(i32, i32)> {
    let years = distinct_years(records);
    Some((*years.first()?, *years.last()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DatasetKind, Schema};

    fn store() -> RecordStore {
        RecordStore::new(
            Schema::for_kind(DatasetKind::Headcount, false, false),
            vec![
                Record::new("Saúde", "R1", "Enfermeiro", 2019),
                Record::new("Saúde", "R1", "Enfermeiro", 2020),
                Record::new("Educação", "R2", "Professor", 2020),
                Record::new("Saúde", "R2", "Professor", 2021),
                Record::new("Administração", "R3", "Agente", 2022),
            ],
        )
    }

    #[test]
    fn year_range_is_inclusive() {
        let s = store();
        let spec = FilterSpec::year_range(2020, 2021, SelectionMode::All);
        let view = apply(&s, &spec);
        let years: Vec<i32> = view.records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2020, 2020, 2021]);
    }

    #[test]
    fn inverted_range_is_empty_in_both_modes() {
        let s = store();
        for mode in [SelectionMode::All, SelectionMode::RequireSelection] {
            let spec = FilterSpec::year_range(2022, 2019, mode).department("Saúde");
            assert!(apply(&s, &spec).is_empty());
        }
    }

    #[test]
    fn empty_departments_depend_on_mode() {
        let s = store();
        let required = FilterSpec::year_range(2019, 2022, SelectionMode::RequireSelection);
        assert!(apply(&s, &required).is_empty());

        let all = FilterSpec::year_range(2019, 2022, SelectionMode::All);
        assert_eq!(apply(&s, &all).len(), 5);
    }

    #[test]
    fn department_and_role_sets_narrow_results() {
        let s = store();
        let spec = FilterSpec::year_range(2019, 2022, SelectionMode::RequireSelection)
            .department("Saúde")
            .roles(["R2"]);
        let view = apply(&s, &spec);
        assert_eq!(view.len(), 1);
        assert_eq!(view.records[0].year, 2021);
    }

    #[test]
    fn empty_role_set_follows_mode() {
        let s = store();
        let mut spec = FilterSpec::year_range(2019, 2022, SelectionMode::RequireSelection)
            .department("Saúde");
        spec.roles = Some(BTreeSet::new());
        assert!(apply(&s, &spec).is_empty());

        spec.mode = SelectionMode::All;
        assert_eq!(apply(&s, &spec).len(), 3);
    }

    #[test]
    fn explicit_year_set() {
        let s = store();
        let spec = FilterSpec::new(
            YearFilter::Only([2019, 2022].into_iter().collect()),
            SelectionMode::All,
        );
        assert_eq!(apply(&s, &spec).len(), 2);

        let none = FilterSpec::new(YearFilter::Only(BTreeSet::new()), SelectionMode::RequireSelection)
            .department("Saúde");
        assert!(apply(&s, &none).is_empty());
    }

    #[test]
    fn selection_options_are_sorted() {
        let s = store();
        assert_eq!(
            distinct_departments(s.records()),
            vec!["Administração", "Educação", "Saúde"]
        );
        assert_eq!(distinct_years(s.records()), vec![2019, 2020, 2021, 2022]);
        assert_eq!(default_year_range(s.records()), Some((2019, 2022)));
        assert_eq!(distinct_roles(s.records()).len(), 3);
    }
}
