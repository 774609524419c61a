//! Record listing command

use anyhow::Result;
use dre_core::{ReportService, StoreClient};

use super::truncate;

pub async fn cmd_records(reports: &ReportService<StoreClient>, limit: usize) -> Result<()> {
    let records = reports.records(Some(limit)).await?;

    if records.is_empty() {
        println!("No records found. Import a ledger with: dre import --file <file>");
        return Ok(());
    }

    println!(
        "{:>6}  {:<8}  {:<24}  {:<7}  {:>14}  {:<18}",
        "ID", "Period", "Project", "Class", "Amount", "Category"
    );
    println!("{}", "-".repeat(86));

    for stored in &records {
        let record = &stored.record;
        println!(
            "{:>6}  {:<8}  {:<24}  {:<7}  {:>14.2}  {:<18}",
            stored.id,
            record.period,
            truncate(&record.project, 24),
            record.classification.as_str(),
            record.amount,
            record.account_category.as_str()
        );
    }

    println!();
    println!("Showing {} record(s)", records.len());
    Ok(())
}
