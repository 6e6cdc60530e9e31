use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::error::Result;
use crate::services::export_service::ExportService;
use crate::services::result_service::exam_names;
use crate::AppState;

/// Export every recorded result as XLSX
pub async fn export_results(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let exams = state.catalog.list_exams().await?;
    let results = state.catalog.list_results().await?;
    let proctoring = state.catalog.list_proctoring().await?;

    let buffer = ExportService::generate_results_xlsx(&results, &proctoring, &exam_names(&exams))?;
    let filename = format!(
        "student_results_{}.xlsx",
        chrono::Utc::now().format("%Y%m%d_%H%M")
    );
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
