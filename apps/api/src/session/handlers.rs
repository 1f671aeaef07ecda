use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::{export_entry, ExportFormat};
use crate::matching::batch::{run_batch, Submission};
use crate::matching::report::with_recruiter_notes;
use crate::session::registry::SharedSession;
use crate::session::store::FormDraft;
use crate::session::view::SessionView;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub view: SessionView,
}

async fn render(session_id: Uuid, session: &SharedSession) -> Json<SessionResponse> {
    let state = session.lock().await;
    Json(SessionResponse {
        session_id,
        view: SessionView::render(&state),
    })
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let (id, session) = state.sessions.create().await;
    (StatusCode::CREATED, render(id, &session).await)
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    Ok(render(id, &session).await)
}

// ────────────────────────────────────────────────────────────────────────────
// Analyze
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct AnalyzeForm {
    job_text: String,
    cv_text: String,
    uploads: Vec<(String, bytes::Bytes)>,
}

async fn read_analyze_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();
    let invalid = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Invalid multipart body: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_text" => form.job_text = field.text().await.map_err(invalid)?,
            "cv_text" => form.cv_text = field.text().await.map_err(invalid)?,
            "cv_files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(invalid)?;
                form.uploads.push((file_name, bytes));
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/v1/sessions/:id/analyze
///
/// Multipart fields: `job_text`, `cv_text`, and any number of `cv_files`.
/// The batch runs in its own task so a dropped connection cannot leave the
/// session stuck in `Submitting`.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let form = read_analyze_form(multipart).await?;
    let draft = FormDraft {
        job_text: form.job_text.clone(),
        cv_text: form.cv_text.clone(),
    };
    let submission = Submission::from_form(&form.job_text, &form.cv_text, form.uploads)?;

    session.lock().await.begin_submission(draft)?;

    let extractor = state.extractor.clone();
    let evaluator = state.evaluator.clone();
    let task_session = session.clone();
    let task = tokio::spawn(async move {
        let outcomes = run_batch(&submission, extractor, evaluator.as_ref()).await;
        task_session.lock().await.commit_batch(outcomes);
    });

    if let Err(e) = task.await {
        session.lock().await.abort_submission();
        return Err(AppError::Internal(anyhow::anyhow!(
            "analysis task failed: {e}"
        )));
    }

    Ok(render(id, &session).await)
}

// ────────────────────────────────────────────────────────────────────────────
// Session controls and pure transitions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/clear
pub async fn handle_clear(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    session.lock().await.clear_inputs()?;
    Ok(render(id, &session).await)
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    session.lock().await.reset()?;
    Ok(render(id, &session).await)
}

#[derive(Deserialize)]
pub struct ThresholdRequest {
    pub threshold: i64,
}

/// PUT /api/v1/sessions/:id/threshold
pub async fn handle_set_threshold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ThresholdRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    session.lock().await.set_threshold(req.threshold)?;
    Ok(render(id, &session).await)
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub entry_id: String,
}

/// POST /api/v1/sessions/:id/select
pub async fn handle_select(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    session.lock().await.select(&req.entry_id)?;
    Ok(render(id, &session).await)
}

#[derive(Deserialize)]
pub struct CompareRequest {
    pub entry_ids: Vec<String>,
}

/// PUT /api/v1/sessions/:id/compare
pub async fn handle_set_comparison(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    session.lock().await.set_comparison(&req.entry_ids)?;
    Ok(render(id, &session).await)
}

#[derive(Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

/// PUT /api/v1/sessions/:id/entries/:entry_id/notes
pub async fn handle_update_notes(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, String)>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    session.lock().await.update_notes(&entry_id, &req.notes)?;
    Ok(render(id, &session).await)
}

// ────────────────────────────────────────────────────────────────────────────
// Report text and downloads
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/sessions/:id/entries/:entry_id/report
///
/// The entry's report with recruiter notes appended, as markdown.
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let session = state.sessions.get(id).await?;
    let guard = session.lock().await;
    let entry = guard.find_entry(&entry_id)?;
    let text = with_recruiter_notes(&entry.report_text, &entry.recruiter_notes);

    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        text,
    )
        .into_response())
}

/// GET /api/v1/sessions/:id/export/:format  (`pdf` | `docx`)
///
/// Exports the currently selected entry.
pub async fn handle_export(
    State(state): State<AppState>,
    Path((id, format)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let format = match format.as_str() {
        "pdf" => ExportFormat::Pdf,
        "docx" => ExportFormat::Docx,
        other => return Err(AppError::NotFound(format!("Unknown export format '{other}'"))),
    };

    let session = state.sessions.get(id).await?;
    let entry = session
        .lock()
        .await
        .selected()
        .cloned()
        .ok_or_else(|| AppError::NotFound("No candidate is selected".to_string()))?;

    let document = export_entry(&entry, format).map_err(|e| AppError::Export(e.to_string()))?;
    tracing::info!(
        session_id = %id,
        file = %document.file_name,
        bytes = document.bytes.len(),
        "Report exported"
    );

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        header_safe_file_name(&document.file_name)
    ))
    .map_err(|e| AppError::Export(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(document.mime_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}

/// Keeps the quoted `filename` parameter to printable ASCII without quotes or backslashes.
fn header_safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_safe_file_name() {
        assert_eq!(
            header_safe_file_name("talent_match_jane_\"doe\"_résumé.pdf"),
            "talent_match_jane__doe__r_sum_.pdf"
        );
        assert_eq!(
            header_safe_file_name("talent_match_cv.pdf_(PDF).pdf"),
            "talent_match_cv.pdf_(PDF).pdf"
        );
    }
}
