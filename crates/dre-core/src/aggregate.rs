//! Monthly and cumulative P&L figures per project
//!
//! Months with neither revenue nor cost repeat the previous month's monthly
//! figures (carry-forward). This can make an idle month look active; it is
//! kept so reports match the figures users already know.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    AccountCategory, Classification, FinancialRecord, MonthEntry, MonthlyFigures, ProjectAggregate,
};

/// `1 - (|cost| - payroll_relief) / revenue`, or 0 without revenue
pub fn margin(revenue: f64, cost: f64, payroll_relief: f64) -> f64 {
    if revenue > 0.0 {
        1.0 - (cost.abs() - payroll_relief) / revenue
    } else {
        0.0
    }
}

/// Split a `"month/year"` period; months outside 1..=12 are rejected
fn parse_period(period: &str) -> Option<(u32, i32)> {
    let (month, year) = period.trim().split_once('/')?;
    let month = month.trim().parse().ok().filter(|m| (1..=12).contains(m))?;
    let year = year.trim().parse().ok()?;
    Some((month, year))
}

/// Month of a period belonging to `year`, if it is a calendar month
fn month_in_year(period: &str, year: i32) -> Option<u32> {
    if !period.trim_end().ends_with(&format!("/{}", year)) {
        return None;
    }
    let (month, _) = period.trim().split_once('/')?;
    month.trim().parse().ok().filter(|m| (1..=12).contains(m))
}

#[derive(Default, Clone, Copy)]
struct Totals {
    revenue: f64,
    payroll_relief: f64,
    cost: f64,
}

impl Totals {
    fn add(&mut self, record: &FinancialRecord) {
        match record.classification {
            Classification::Revenue => self.revenue += record.amount,
            Classification::Cost => self.cost += record.amount.abs(),
        }
        if record.account_category == AccountCategory::PayrollTaxRelief {
            self.payroll_relief += record.amount;
        }
    }

    fn is_idle(&self) -> bool {
        self.revenue == 0.0 && self.cost == 0.0
    }

    fn figures(&self) -> MonthlyFigures {
        MonthlyFigures {
            revenue: self.revenue,
            payroll_relief: self.payroll_relief,
            cost: self.cost,
            margin: margin(self.revenue, self.cost, self.payroll_relief),
        }
    }
}

/// Build one aggregate per project for `year`, sorted by project name
///
/// Records are matched on a `period` ending in `/<year>`; months outside
/// 1..=12 are ignored. `project` restricts the output to that project.
pub fn aggregate<'a, I>(records: I, year: i32, project: Option<&str>) -> Vec<ProjectAggregate>
where
    I: IntoIterator<Item = &'a FinancialRecord>,
{
    let mut buckets: BTreeMap<&str, [Totals; 12]> = BTreeMap::new();

    for record in records {
        if project.is_some_and(|p| p != record.project) {
            continue;
        }
        let Some(month) = month_in_year(&record.period, year) else {
            continue;
        };
        let months = buckets.entry(record.project.as_str()).or_default();
        months[(month - 1) as usize].add(record);
    }

    buckets
        .into_iter()
        .map(|(project, months)| ProjectAggregate {
            project: project.to_string(),
            year,
            months: walk_months(&months),
        })
        .collect()
}

fn walk_months(months: &[Totals; 12]) -> Vec<MonthEntry> {
    let mut entries = Vec::with_capacity(12);
    let mut previous = Totals::default();
    let mut running = Totals::default();

    for (index, totals) in months.iter().enumerate() {
        let monthly = if totals.is_idle() { previous } else { *totals };

        running.revenue += monthly.revenue;
        running.payroll_relief += monthly.payroll_relief;
        running.cost += monthly.cost;

        entries.push(MonthEntry {
            month: index as u32 + 1,
            monthly: monthly.figures(),
            cumulative: running.figures(),
        });
        previous = monthly;
    }

    entries
}

/// Distinct project names, sorted
pub fn list_projects<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a FinancialRecord>,
{
    records
        .into_iter()
        .map(|r| r.project.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Distinct years found in record periods, sorted
pub fn list_years<'a, I>(records: I) -> Vec<i32>
where
    I: IntoIterator<Item = &'a FinancialRecord>,
{
    records
        .into_iter()
        .filter_map(|r| parse_period(&r.period))
        .map(|(_, year)| year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
