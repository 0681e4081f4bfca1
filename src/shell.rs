//! Two-state interaction shell behind the dashboard page.
//!
//! The shell starts `Idle`. Changing the selected date does nothing on its own;
//! only [`Shell::trigger`] reads the selection and moves to `Analyzed`.

use crate::models::Dataset;
use crate::present::{present, ChartSpec, Presentation, TableRow, NO_DATA_MESSAGE};
use crate::stats::{aggregate, Classifier, DateFilter, NoDataForFilter, ALL_DATES};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum ShellState {
    Idle,
    Analyzed {
        filter: DateFilter,
        outcome: Result<Presentation, NoDataForFilter>,
    },
}

pub struct Shell<'a> {
    dataset: &'a Dataset,
    classifier: &'a Classifier,
    selected: DateFilter,
    state: ShellState,
}

impl<'a> Shell<'a> {
    pub fn new(dataset: &'a Dataset, classifier: &'a Classifier) -> Self {
        Self {
            dataset,
            classifier,
            selected: DateFilter::All,
            state: ShellState::Idle,
        }
    }

    pub fn select(&mut self, filter: DateFilter) {
        self.selected = filter;
    }

    pub fn selected(&self) -> &DateFilter {
        &self.selected
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Recomputes everything for the current selection.
    pub fn trigger(&mut self) -> &ShellState {
        let filter = self.selected.clone();
        let outcome = aggregate(self.dataset.records(), &filter, self.classifier)
            .map(|aggregation| present(&aggregation, &filter));
        self.state = ShellState::Analyzed { filter, outcome };
        &self.state
    }

    pub fn options(&self) -> Vec<(String, String)> {
        let mut options: Vec<_> = self
            .dataset
            .dates()
            .into_iter()
            .map(|date| (date.clone(), date))
            .collect();
        options.push(("All data".to_string(), ALL_DATES.to_string()));
        options
    }

    pub fn view(&self) -> ShellView {
        let mut view = ShellView {
            state: "idle",
            filter: self.selected.clone(),
            options: self.options(),
            chart: None,
            table: Vec::new(),
            summary: String::new(),
            message: None,
        };

        if let ShellState::Analyzed { filter, outcome } = &self.state {
            view.state = "analyzed";
            view.filter = filter.clone();
            match outcome {
                Ok(presentation) => {
                    view.chart = Some(presentation.chart.clone());
                    view.table = presentation.table.clone();
                    view.summary = presentation.summary.clone();
                }
                Err(_) => view.message = Some(NO_DATA_MESSAGE.to_string()),
            }
        }

        view
    }
}

/// Everything the page needs to render one state of the shell.
#[derive(Debug, Clone, Serialize)]
pub struct ShellView {
    pub state: &'static str,
    pub filter: DateFilter,
    #[serde(skip)]
    pub options: Vec<(String, String)>,
    pub chart: Option<ChartSpec>,
    pub table: Vec<TableRow>,
    pub summary: String,
    pub message: Option<String>,
}
