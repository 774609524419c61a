//! Row filtering and normalization into financial records
//!
//! Column headers come from the ledger export:
//! `Relatorio`, `Lancamento`, `Natureza`, `Projeto`, `Periodo`,
//! `ContaResumo`, `DenominacaoConta`, `LinhaNegocio`.

use serde_json::Value;

use crate::amount::parse_amount;
use crate::models::{AccountCategory, Classification, FinancialRecord, RawRow, DEFAULT_PROJECT};

pub const REPORT_STATUS_FIELD: &str = "Relatorio";
pub const AMOUNT_FIELD: &str = "Lancamento";
pub const NATURE_FIELD: &str = "Natureza";
pub const PROJECT_FIELD: &str = "Projeto";
pub const PERIOD_FIELD: &str = "Periodo";
pub const ACCOUNT_SUMMARY_FIELD: &str = "ContaResumo";
pub const ACCOUNT_NAME_FIELD: &str = "DenominacaoConta";
pub const BUSINESS_LINE_FIELD: &str = "LinhaNegocio";

/// Report status of actual (realized) figures, as opposed to forecasts
pub const ACTUAL_STATUS: &str = "Realizado";

/// Nature label of revenue lines
pub const REVENUE_NATURE: &str = "RECEITA";

/// Whether a row is an actual figure with a posting amount
///
/// Forecast rows and rows without an amount are dropped silently.
pub fn is_actual_row(row: &RawRow) -> bool {
    let is_actual = matches!(
        row.get(REPORT_STATUS_FIELD),
        Some(Value::String(status)) if status == ACTUAL_STATUS
    );

    is_actual && has_amount(row)
}

fn has_amount(row: &RawRow) -> bool {
    match row.get(AMOUNT_FIELD) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Classify a nature label: only `RECEITA` (any case) is revenue
pub fn classify_nature(nature: Option<&str>) -> Classification {
    match nature {
        Some(n) if n.trim().to_uppercase() == REVENUE_NATURE => Classification::Revenue,
        _ => Classification::Cost,
    }
}

/// Map a free-text account label onto the category vocabulary
///
/// Case- and accent-insensitive substring match, first rule wins.
pub fn normalize_account_category(label: &str) -> AccountCategory {
    let label = fold_accents(&label.to_uppercase());

    if label.contains("RECEITA") || label.contains("REVENUE") {
        AccountCategory::RevenueRecognized
    } else if label.contains("DESONERA") || label.contains("PAYROLL") {
        AccountCategory::PayrollTaxRelief
    } else if label.contains("CLT") {
        AccountCategory::Clt
    } else if label.contains("SUBCONTRAT") || label.contains("SUBCONTRACT") {
        AccountCategory::Subcontractors
    } else {
        AccountCategory::Other
    }
}

/// Strip Portuguese diacritics from an upper-cased label
fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Read a cell as trimmed text; numbers are rendered, empty cells are None
fn field_text(row: &RawRow, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Turn a retained row into a record tagged with the import's batch id
pub fn normalize_row(row: &RawRow, batch_id: &str, file_name: &str) -> FinancialRecord {
    let nature = field_text(row, NATURE_FIELD);
    let account_summary = field_text(row, ACCOUNT_SUMMARY_FIELD);
    let account_name = field_text(row, ACCOUNT_NAME_FIELD);

    let category_label = account_summary
        .as_deref()
        .or(account_name.as_deref())
        .unwrap_or("");

    FinancialRecord {
        batch_id: batch_id.to_string(),
        source_file_name: file_name.to_string(),
        classification: classify_nature(nature.as_deref()),
        nature,
        project: field_text(row, PROJECT_FIELD).unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        amount: parse_amount(row.get(AMOUNT_FIELD).unwrap_or(&Value::Null)),
        period: field_text(row, PERIOD_FIELD).unwrap_or_default(),
        account_category: normalize_account_category(category_label),
        account_summary,
        account_name,
        business_line: field_text(row, BUSINESS_LINE_FIELD),
        raw_payload: Value::Object(row.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_only_realized_rows_with_amount_are_kept() {
        assert!(is_actual_row(&row(json!({"Relatorio": "Realizado", "Lancamento": "10"}))));
        assert!(is_actual_row(&row(json!({"Relatorio": "Realizado", "Lancamento": 0}))));
        assert!(!is_actual_row(&row(json!({"Relatorio": "Previsto", "Lancamento": "10"}))));
        assert!(!is_actual_row(&row(json!({"Relatorio": "realizado", "Lancamento": "10"}))));
        assert!(!is_actual_row(&row(json!({"Relatorio": "Realizado", "Lancamento": ""}))));
        assert!(!is_actual_row(&row(json!({"Relatorio": "Realizado", "Lancamento": null}))));
        assert!(!is_actual_row(&row(json!({"Relatorio": "Realizado"}))));
        assert!(!is_actual_row(&row(json!({"Lancamento": "10"}))));
    }

    #[test]
    fn test_blank_amount_is_kept_as_zero() {
        let source = row(json!({"Relatorio": "Realizado", "Lancamento": "  "}));
        assert!(is_actual_row(&source));
        assert_eq!(normalize_row(&source, "b", "rows.json").amount, 0.0);
    }

    #[test]
    fn test_classify_nature() {
        assert_eq!(classify_nature(Some("RECEITA")), Classification::Revenue);
        assert_eq!(classify_nature(Some("receita")), Classification::Revenue);
        assert_eq!(classify_nature(Some(" Receita ")), Classification::Revenue);
        assert_eq!(classify_nature(Some("CUSTO")), Classification::Cost);
        assert_eq!(classify_nature(Some("RECEITA LIQUIDA")), Classification::Cost);
        assert_eq!(classify_nature(None), Classification::Cost);
    }

    #[test]
    fn test_normalize_account_category() {
        assert_eq!(
            normalize_account_category("Receita Devengada"),
            AccountCategory::RevenueRecognized
        );
        assert_eq!(
            normalize_account_category("Desoneração da Folha"),
            AccountCategory::PayrollTaxRelief
        );
        assert_eq!(normalize_account_category("Mão de Obra CLT"), AccountCategory::Clt);
        assert_eq!(
            normalize_account_category("SUBCONTRATAÇÃO"),
            AccountCategory::Subcontractors
        );
        assert_eq!(normalize_account_category("Viagens"), AccountCategory::Other);
        assert_eq!(normalize_account_category(""), AccountCategory::Other);
    }

    #[test]
    fn test_normalize_row() {
        let source = row(json!({
            "Relatorio": "Realizado",
            "Natureza": "RECEITA",
            "Lancamento": "10.000,00",
            "Projeto": "Alpha",
            "Periodo": "1/2024",
            "ContaResumo": "Receita Devengada",
            "LinhaNegocio": "Cloud"
        }));

        let record = normalize_row(&source, "batch-1", "dre.xlsx");
        assert_eq!(record.batch_id, "batch-1");
        assert_eq!(record.source_file_name, "dre.xlsx");
        assert_eq!(record.amount, 10000.0);
        assert_eq!(record.classification, Classification::Revenue);
        assert_eq!(record.account_category, AccountCategory::RevenueRecognized);
        assert_eq!(record.project, "Alpha");
        assert_eq!(record.period, "1/2024");
        assert_eq!(record.business_line.as_deref(), Some("Cloud"));
        assert_eq!(record.raw_payload["Lancamento"], "10.000,00");
    }

    #[test]
    fn test_missing_project_defaults() {
        let source = row(json!({"Relatorio": "Realizado", "Lancamento": "5", "Projeto": "  "}));
        let record = normalize_row(&source, "b", "f.csv");
        assert_eq!(record.project, DEFAULT_PROJECT);
        assert_eq!(record.classification, Classification::Cost);
        assert_eq!(record.account_category, AccountCategory::Other);
    }

    #[test]
    fn test_category_falls_back_to_account_name() {
        let source = row(json!({
            "Relatorio": "Realizado",
            "Lancamento": "5",
            "DenominacaoConta": "Salarios CLT"
        }));
        let record = normalize_row(&source, "b", "f.csv");
        assert_eq!(record.account_category, AccountCategory::Clt);
    }
}
