//! Report command implementations

use std::fmt::Write;

use anyhow::Result;
use chrono::{Datelike, Utc};
use dre_core::{MonthlyFigures, ProjectAggregate, ReportService, StoreClient};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub async fn cmd_report(
    reports: &ReportService<StoreClient>,
    year: Option<i32>,
    project: Option<&str>,
    json: bool,
) -> Result<()> {
    let year = year.unwrap_or_else(|| Utc::now().year());
    let aggregates = reports.monthly_report(year, project).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregates)?);
        return Ok(());
    }

    if aggregates.is_empty() {
        match project {
            Some(p) => println!("No records for project '{}' in {}", p, year),
            None => println!("No records for {}", year),
        }
        return Ok(());
    }

    print!("{}", format_report(&aggregates));
    Ok(())
}

/// Render aggregates as one table per project
pub fn format_report(aggregates: &[ProjectAggregate]) -> String {
    let mut out = String::new();

    for aggregate in aggregates {
        let _ = writeln!(out, "📊 {} ({})", aggregate.project, aggregate.year);
        let _ = writeln!(
            out,
            "   {:<5} {:>14} {:>14} {:>12} {:>8} │ {:>14} {:>14} {:>8}",
            "Month", "Revenue", "Cost", "Relief", "Margin", "YTD Revenue", "YTD Cost", "YTD Mgn"
        );
        let _ = writeln!(out, "   {}", "-".repeat(100));

        for entry in &aggregate.months {
            let name = MONTH_NAMES
                .get(entry.month.saturating_sub(1) as usize)
                .copied()
                .unwrap_or("?");
            let _ = writeln!(
                out,
                "   {:<5} {} │ {:>14.2} {:>14.2} {:>8}",
                name,
                format_figures(&entry.monthly),
                entry.cumulative.revenue,
                entry.cumulative.cost,
                format_margin(entry.cumulative.margin)
            );
        }
        out.push('\n');
    }

    out
}

fn format_figures(figures: &MonthlyFigures) -> String {
    format!(
        "{:>14.2} {:>14.2} {:>12.2} {:>8}",
        figures.revenue,
        figures.cost,
        figures.payroll_relief,
        format_margin(figures.margin)
    )
}

/// Margin ratio as a percentage with one decimal
pub fn format_margin(margin: f64) -> String {
    format!("{:.1}%", margin * 100.0)
}

pub async fn cmd_projects(reports: &ReportService<StoreClient>) -> Result<()> {
    let projects = reports.projects().await?;

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!("📁 Projects ({}):", projects.len());
    for project in &projects {
        println!("   {}", project);
    }
    Ok(())
}

pub async fn cmd_years(reports: &ReportService<StoreClient>) -> Result<()> {
    let years = reports.years().await?;

    if years.is_empty() {
        println!("No years found.");
        return Ok(());
    }

    let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
    println!("📅 Years: {}", years.join(", "));
    Ok(())
}
