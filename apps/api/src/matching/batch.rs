//! Batch runner: evaluates every CV of one submission, one at a time.
//!
//! Each CV produces exactly one `ItemOutcome`. Extraction and evaluation
//! failures become zero-score entries so the rest of the batch still runs.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extract::{CvExtractor, ExtractedCv, ExtractionError};
use crate::matching::evaluator::MatchEvaluator;
use crate::models::analysis::AnalysisEntry;

pub const PASTED_SOURCE: &str = "Pasted text";

/// One CV as submitted by the recruiter.
#[derive(Debug, Clone)]
pub enum CvInput {
    Upload { file_name: String, bytes: Bytes },
    Pasted(String),
}

/// A validated submission: non-empty job text plus at least one CV.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job_text: String,
    pub cvs: Vec<CvInput>,
}

impl Submission {
    /// Applies the form rules: the job text is required; uploaded files take
    /// precedence over pasted text; one of the two must be present.
    pub fn from_form(
        job_text: &str,
        pasted_cv: &str,
        uploads: Vec<(String, Bytes)>,
    ) -> Result<Self, AppError> {
        let job_text = job_text.trim();
        if job_text.is_empty() {
            return Err(AppError::Validation(
                "Please paste a Job Description.".to_string(),
            ));
        }

        let uploads: Vec<CvInput> = uploads
            .into_iter()
            .filter(|(_, bytes)| !bytes.is_empty())
            .map(|(file_name, bytes)| CvInput::Upload { file_name, bytes })
            .collect();

        let cvs = if !uploads.is_empty() {
            uploads
        } else if !pasted_cv.trim().is_empty() {
            vec![CvInput::Pasted(pasted_cv.trim().to_string())]
        } else {
            return Err(AppError::Validation(
                "Upload at least one CV OR paste CV text.".to_string(),
            ));
        };

        Ok(Self {
            job_text: job_text.to_string(),
            cvs,
        })
    }
}

/// Result of processing one CV.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Evaluated(AnalysisEntry),
    Failed(AnalysisEntry),
}

impl ItemOutcome {
    pub fn into_entry(self) -> AnalysisEntry {
        match self {
            ItemOutcome::Evaluated(entry) | ItemOutcome::Failed(entry) => entry,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }
}

/// Runs extraction then evaluation for each CV, sequentially and in input order.
pub async fn run_batch(
    submission: &Submission,
    extractor: Arc<dyn CvExtractor>,
    evaluator: &dyn MatchEvaluator,
) -> Vec<ItemOutcome> {
    info!("Analyzing {} CV(s)", submission.cvs.len());

    let mut outcomes = Vec::with_capacity(submission.cvs.len());
    for cv in &submission.cvs {
        let outcome = process_one(&submission.job_text, cv, extractor.clone(), evaluator).await;
        outcomes.push(outcome);
    }

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    info!(
        total = outcomes.len(),
        failed, "Batch analysis finished"
    );
    outcomes
}

async fn process_one(
    job_text: &str,
    cv: &CvInput,
    extractor: Arc<dyn CvExtractor>,
    evaluator: &dyn MatchEvaluator,
) -> ItemOutcome {
    let (cv_text, cv_source) = match cv {
        CvInput::Pasted(text) => (text.clone(), PASTED_SOURCE.to_string()),
        CvInput::Upload { file_name, bytes } => {
            match extract_on_blocking_pool(extractor, file_name, bytes.clone()).await {
                Ok(extracted) => {
                    let source = extracted.source_label(file_name);
                    (extracted.text, source)
                }
                Err(reason) => {
                    warn!(file = %file_name, "CV extraction failed: {reason}");
                    return ItemOutcome::Failed(AnalysisEntry::extraction_failed(
                        job_text, file_name, &reason,
                    ));
                }
            }
        }
    };

    match evaluator.evaluate(job_text, &cv_text).await {
        Ok(assessment) => {
            ItemOutcome::Evaluated(AnalysisEntry::evaluated(job_text, &cv_source, assessment))
        }
        Err(e) => {
            warn!(source = %cv_source, "CV evaluation failed: {e}");
            ItemOutcome::Failed(AnalysisEntry::evaluation_failed(
                job_text,
                &cv_source,
                &e.to_string(),
            ))
        }
    }
}

/// PDF parsing is CPU-bound and may panic on malformed input; both cases
/// surface as an extraction failure message.
async fn extract_on_blocking_pool(
    extractor: Arc<dyn CvExtractor>,
    file_name: &str,
    bytes: Bytes,
) -> Result<ExtractedCv, String> {
    let name = file_name.to_string();
    let joined = tokio::task::spawn_blocking(move || extractor.extract(&name, &bytes)).await;

    match joined {
        Ok(result) => result.map_err(|e: ExtractionError| e.to_string()),
        Err(join_err) => Err(format!("document parser crashed: {join_err}")),
    }
}
