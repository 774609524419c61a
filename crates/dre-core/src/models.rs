//! Domain models for DRE

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A spreadsheet row keyed by column header
pub type RawRow = serde_json::Map<String, Value>;

/// Project label used when a row has no project
pub const DEFAULT_PROJECT: &str = "No Project";

/// Whether a ledger line is revenue or cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Revenue,
    Cost,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Cost => "cost",
        }
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "revenue" => Ok(Self::Revenue),
            "cost" => Ok(Self::Cost),
            _ => Err(format!("Unknown classification: {}", s)),
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized account category vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccountCategory {
    #[serde(rename = "REVENUE RECOGNIZED")]
    RevenueRecognized,
    #[serde(rename = "PAYROLL TAX RELIEF")]
    PayrollTaxRelief,
    #[serde(rename = "CLT")]
    Clt,
    #[serde(rename = "SUBCONTRACTORS")]
    Subcontractors,
    #[default]
    #[serde(rename = "OTHER")]
    Other,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RevenueRecognized => "REVENUE RECOGNIZED",
            Self::PayrollTaxRelief => "PAYROLL TAX RELIEF",
            Self::Clt => "CLT",
            Self::Subcontractors => "SUBCONTRACTORS",
            Self::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for AccountCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REVENUE RECOGNIZED" => Ok(Self::RevenueRecognized),
            "PAYROLL TAX RELIEF" => Ok(Self::PayrollTaxRelief),
            "CLT" => Ok(Self::Clt),
            "SUBCONTRACTORS" => Ok(Self::Subcontractors),
            "OTHER" => Ok(Self::Other),
            _ => Err(format!("Unknown account category: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One normalized ledger line produced by an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Shared by every record of one import run
    pub batch_id: String,
    pub source_file_name: String,
    pub classification: Classification,
    /// Raw nature label (Natureza) as found in the sheet
    pub nature: Option<String>,
    pub project: String,
    pub amount: f64,
    /// "month/year", e.g. "3/2024"
    pub period: String,
    pub account_category: AccountCategory,
    /// Raw account summary label (ContaResumo)
    pub account_summary: Option<String>,
    /// Account denomination (DenominacaoConta)
    pub account_name: Option<String>,
    /// Business line (LinhaNegocio)
    pub business_line: Option<String>,
    /// The untransformed source row
    pub raw_payload: Value,
}

/// A record as read back from a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: FinancialRecord,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    /// Records persisted by successful chunks
    pub count: usize,
    pub batch_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ImportResult {
    pub(crate) fn failure(batch_id: &str, message: String) -> Self {
        Self {
            success: false,
            count: 0,
            batch_id: batch_id.to_string(),
            errors: vec![message],
        }
    }
}

/// Revenue, payroll relief, cost and margin for one month (or a running total)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    pub revenue: f64,
    pub payroll_relief: f64,
    /// Always non-negative (sum of absolute cost amounts)
    pub cost: f64,
    /// Ratio, not a percentage
    pub margin: f64,
}

/// One month of a project's year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthEntry {
    /// 1..=12
    pub month: u32,
    pub monthly: MonthlyFigures,
    pub cumulative: MonthlyFigures,
}

/// Twelve months of figures for a project in a given year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAggregate {
    pub project: String,
    pub year: i32,
    pub months: Vec<MonthEntry>,
}

impl ProjectAggregate {
    /// The entry for a calendar month (1..=12)
    pub fn month(&self, month: u32) -> Option<&MonthEntry> {
        self.months.iter().find(|m| m.month == month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_category_serializes_as_label() {
        let json = serde_json::to_string(&AccountCategory::PayrollTaxRelief).unwrap();
        assert_eq!(json, "\"PAYROLL TAX RELIEF\"");
        let parsed: AccountCategory = serde_json::from_str("\"REVENUE RECOGNIZED\"").unwrap();
        assert_eq!(parsed, AccountCategory::RevenueRecognized);
    }

    #[test]
    fn test_classification_from_str() {
        assert_eq!("Revenue".parse::<Classification>(), Ok(Classification::Revenue));
        assert_eq!("cost".parse::<Classification>(), Ok(Classification::Cost));
        assert!("receita".parse::<Classification>().is_err());
    }

    #[test]
    fn test_import_result_omits_empty_errors() {
        let result = ImportResult {
            success: true,
            count: 3,
            batch_id: "b".to_string(),
            errors: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["count"], 3);
    }
}
