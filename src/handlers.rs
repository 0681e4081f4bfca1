use crate::errors::AppError;
use crate::models::{AnalysisRequest, Dataset, DateOption, DateOptionsResponse, HealthResponse};
use crate::shell::{Shell, ShellView};
use crate::state::AppState;
use crate::stats::{DateFilter, ALL_DATES};
use crate::ui::render_index;
use axum::{extract::State, response::Html, Form, Json};
use tracing::info;

const MAX_FILTER_LEN: usize = 64;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let shell = Shell::new(&state.dataset, &state.classifier);
    Html(render_index(&shell.view()))
}

pub async fn analyze(
    State(state): State<AppState>,
    Form(request): Form<AnalysisRequest>,
) -> Result<Html<String>, AppError> {
    let view = run_analysis(&state, &request)?;
    Ok(Html(render_index(&view)))
}

pub async fn post_analysis(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<ShellView>, AppError> {
    Ok(Json(run_analysis(&state, &request)?))
}

pub async fn get_dates(State(state): State<AppState>) -> Json<DateOptionsResponse> {
    let shell = Shell::new(&state.dataset, &state.classifier);
    let options = shell
        .options()
        .into_iter()
        .map(|(label, value)| DateOption { label, value })
        .collect();

    Json(DateOptionsResponse {
        default: ALL_DATES.to_string(),
        options,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        records: state.dataset.len(),
    })
}

fn run_analysis(state: &AppState, request: &AnalysisRequest) -> Result<ShellView, AppError> {
    let filter = requested_filter(&state.dataset, request)?;
    let mut shell = Shell::new(&state.dataset, &state.classifier);
    shell.select(filter);
    shell.trigger();

    let view = shell.view();
    info!(filter = %view.filter, rows = view.table.len(), "analysis requested");
    Ok(view)
}

/// Dates present in the dataset are taken verbatim; anything else is validated first.
fn requested_filter(dataset: &Dataset, request: &AnalysisRequest) -> Result<DateFilter, AppError> {
    let raw = request.date.as_deref();
    if let Some(value) = raw {
        if dataset.contains_date(value) {
            return Ok(DateFilter::Date(value.to_string()));
        }
        if value.len() > MAX_FILTER_LEN {
            return Err(AppError::bad_request("date is too long"));
        }
        if value.chars().any(char::is_control) {
            return Err(AppError::bad_request("date contains control characters"));
        }
    }
    Ok(DateFilter::parse(raw))
}
