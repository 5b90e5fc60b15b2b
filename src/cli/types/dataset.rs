//! Dataset catalogue for the DOGE API.

use crate::error::{DogeError, Result};
use std::fmt;
use std::str::FromStr;

/// A named API resource category.
///
/// The three savings datasets are served under `/savings/...`; the others are
/// legacy endpoints that the API no longer publishes but that older
/// deployments may still answer.
///
/// # Examples
///
/// ```rust
/// use doge_export::Dataset;
///
/// assert_eq!(Dataset::Grants.endpoint(), "/savings/grants");
/// assert_eq!("leases".parse::<Dataset>().unwrap(), Dataset::Leases);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Dataset {
    Grants,
    Contracts,
    Leases,
    Departments,
    Employees,
    Budget,
    #[value(name = "efficiency_metrics", alias = "efficiency-metrics")]
    EfficiencyMetrics,
    Projects,
}

impl Dataset {
    /// Every known dataset, current ones first.
    pub const ALL: [Dataset; 8] = [
        Dataset::Grants,
        Dataset::Contracts,
        Dataset::Leases,
        Dataset::Departments,
        Dataset::Employees,
        Dataset::Budget,
        Dataset::EfficiencyMetrics,
        Dataset::Projects,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Grants => "grants",
            Dataset::Contracts => "contracts",
            Dataset::Leases => "leases",
            Dataset::Departments => "departments",
            Dataset::Employees => "employees",
            Dataset::Budget => "budget",
            Dataset::EfficiencyMetrics => "efficiency_metrics",
            Dataset::Projects => "projects",
        }
    }

    /// Path below the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Dataset::Grants => "/savings/grants",
            Dataset::Contracts => "/savings/contracts",
            Dataset::Leases => "/savings/leases",
            Dataset::Departments => "/departments",
            Dataset::Employees => "/employees",
            Dataset::Budget => "/budget",
            Dataset::EfficiencyMetrics => "/efficiency",
            Dataset::Projects => "/projects",
        }
    }

    /// Key of the record list inside the envelope's `result` object.
    pub fn result_key(&self) -> &'static str {
        result_key_for_endpoint(self.endpoint())
    }

    /// Field the API sorts by unless the user asks otherwise.
    pub fn default_sort_key(&self) -> &'static str {
        match self {
            Dataset::Grants | Dataset::Contracts | Dataset::Leases => "savings",
            Dataset::Departments => "department_id",
            Dataset::Employees => "employee_id",
            Dataset::Budget => "budget_id",
            Dataset::EfficiencyMetrics => "metric_id",
            Dataset::Projects => "project_id",
        }
    }

    /// Human-readable name, also used as the worksheet name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Dataset::Grants => "Grant Savings",
            Dataset::Contracts => "Contract Savings",
            Dataset::Leases => "Lease Savings",
            Dataset::Departments => "Departments",
            Dataset::Employees => "Employees",
            Dataset::Budget => "Budget Information",
            Dataset::EfficiencyMetrics => "Efficiency Metrics",
            Dataset::Projects => "Projects and Initiatives",
        }
    }

    pub fn is_legacy(&self) -> bool {
        !matches!(self, Dataset::Grants | Dataset::Contracts | Dataset::Leases)
    }

    /// Columns whose numeric-looking text is written as numbers on export.
    pub fn numeric_fields(&self) -> &'static [&'static str] {
        match self {
            Dataset::Grants | Dataset::Contracts | Dataset::Leases => {
                &["value", "savings", "sq_ft"]
            }
            Dataset::Employees => &["salary"],
            Dataset::Budget => &["amount", "fiscal_year"],
            Dataset::EfficiencyMetrics => &["value", "target"],
            Dataset::Projects => &["budget"],
            Dataset::Departments => &[],
        }
    }

    /// Columns whose date-like text is written as dates on export.
    pub fn date_fields(&self) -> &'static [&'static str] {
        match self {
            Dataset::Grants | Dataset::Contracts | Dataset::Leases => &["date"],
            Dataset::Employees => &["hire_date"],
            Dataset::EfficiencyMetrics => &["date"],
            Dataset::Projects => &["start_date", "end_date"],
            Dataset::Departments | Dataset::Budget => &[],
        }
    }
}

/// Last path segment of an endpoint, e.g. `grants` for `/savings/grants`.
pub fn result_key_for_endpoint(endpoint: &str) -> &str {
    endpoint
        .trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(endpoint)
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dataset {
    type Err = DogeError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Dataset::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| DogeError::Config {
                key: "data type".to_string(),
                reason: format!("unknown dataset '{}'", s),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_endpoints() {
        assert_eq!(Dataset::Grants.endpoint(), "/savings/grants");
        assert_eq!(Dataset::Contracts.endpoint(), "/savings/contracts");
        assert_eq!(Dataset::Leases.endpoint(), "/savings/leases");
    }

    #[test]
    fn test_legacy_endpoints() {
        assert_eq!(Dataset::Departments.endpoint(), "/departments");
        assert_eq!(Dataset::EfficiencyMetrics.endpoint(), "/efficiency");
        assert!(Dataset::ALL
            .iter()
            .filter(|d| d.is_legacy())
            .all(|d| !d.endpoint().starts_with("/savings")));
    }

    #[test]
    fn test_result_key_is_last_segment() {
        assert_eq!(Dataset::Grants.result_key(), "grants");
        assert_eq!(Dataset::EfficiencyMetrics.result_key(), "efficiency");
        assert_eq!(result_key_for_endpoint("savings/leases/"), "leases");
        assert_eq!(result_key_for_endpoint("/projects"), "projects");
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for dataset in Dataset::ALL {
            assert_eq!(dataset.name().parse::<Dataset>().unwrap(), dataset);
            assert_eq!(dataset.to_string(), dataset.name());
        }
        assert_eq!(
            "Efficiency-Metrics".parse::<Dataset>().unwrap(),
            Dataset::EfficiencyMetrics
        );
    }

    #[test]
    fn test_unknown_dataset_is_rejected() {
        assert!("payroll".parse::<Dataset>().is_err());
    }

    #[test]
    fn test_display_names_fit_worksheet_limit() {
        for dataset in Dataset::ALL {
            assert!(dataset.display_name().len() <= 31, "{}", dataset);
        }
    }

    #[test]
    fn test_date_fields() {
        assert_eq!(Dataset::Employees.date_fields(), &["hire_date"]);
        assert_eq!(Dataset::Projects.date_fields(), &["start_date", "end_date"]);
        assert!(Dataset::Budget.date_fields().is_empty());
        for dataset in Dataset::ALL {
            assert!(dataset
                .date_fields()
                .iter()
                .all(|field| !dataset.numeric_fields().contains(field)));
        }
    }

    #[test]
    fn test_savings_datasets_sort_by_savings() {
        assert_eq!(Dataset::Grants.default_sort_key(), "savings");
        assert_eq!(Dataset::Employees.default_sort_key(), "employee_id");
    }
}
