use crate::stats::{Aggregation, BucketAggregate, DateFilter};
use serde::Serialize;

pub const CURRENCY: &str = "€";
pub const ADULTS_COLOR: &str = "#1f77b4";
pub const CHILDREN_COLOR: &str = "#ff7f0e";
pub const NO_DATA_MESSAGE: &str = "No data available for the selected date.";

pub const TABLE_COLUMNS: [&str; 7] = [
    "Time slot",
    "Adults",
    "Children",
    "Total",
    "Adult revenue",
    "Child revenue",
    "Total revenue",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub color: String,
    pub values: Vec<u64>,
}

/// Stacked bar chart, one category per time slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub bar_mode: String,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Height of the tallest stacked bar.
    pub fn max_stack(&self) -> u64 {
        (0..self.categories.len())
            .map(|index| {
                self.series
                    .iter()
                    .filter_map(|series| series.values.get(index))
                    .sum::<u64>()
            })
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub time_slot: String,
    pub adults: u64,
    pub children: u64,
    pub total: u64,
    pub adult_revenue: String,
    pub child_revenue: String,
    pub total_revenue: String,
    pub highlight: bool,
}

impl TableRow {
    fn from_aggregate(row: &BucketAggregate, highlight: bool) -> Self {
        Self {
            time_slot: row.bucket.clone(),
            adults: row.adults,
            children: row.children,
            total: row.total,
            adult_revenue: format_currency(row.adult_revenue),
            child_revenue: format_currency(row.child_revenue),
            total_revenue: format_currency(row.total_revenue),
            highlight,
        }
    }

    pub fn cells(&self) -> [String; 7] {
        [
            self.time_slot.clone(),
            self.adults.to_string(),
            self.children.to_string(),
            self.total.to_string(),
            self.adult_revenue.clone(),
            self.child_revenue.clone(),
            self.total_revenue.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub chart: ChartSpec,
    pub table: Vec<TableRow>,
    pub summary: String,
}

pub fn format_currency(value: u64) -> String {
    format!("{value} {CURRENCY}")
}

pub fn chart_title(filter: &DateFilter) -> String {
    format!("Customers per half hour ({filter})")
}

pub fn present(aggregation: &Aggregation, filter: &DateFilter) -> Presentation {
    let chart = ChartSpec {
        title: chart_title(filter),
        x_title: "Time slot".to_string(),
        y_title: "Customers".to_string(),
        bar_mode: "stack".to_string(),
        categories: aggregation.buckets.iter().map(|row| row.bucket.clone()).collect(),
        series: vec![
            ChartSeries {
                name: "Adults".to_string(),
                color: ADULTS_COLOR.to_string(),
                values: aggregation.buckets.iter().map(|row| row.adults).collect(),
            },
            ChartSeries {
                name: "Children".to_string(),
                color: CHILDREN_COLOR.to_string(),
                values: aggregation.buckets.iter().map(|row| row.children).collect(),
            },
        ],
    };

    let table = aggregation
        .buckets
        .iter()
        .map(|row| TableRow::from_aggregate(row, false))
        .chain(std::iter::once(TableRow::from_aggregate(&aggregation.total, true)))
        .collect();

    Presentation {
        chart,
        table,
        summary: summary(&aggregation.total),
    }
}

/// One-line summary taken from the total row.
pub fn summary(total: &BucketAggregate) -> String {
    format!(
        "Totals: adults={}, children={}, customers={}, revenue={}",
        total.adults,
        total.children,
        total.total,
        format_currency(total.total_revenue)
    )
}
