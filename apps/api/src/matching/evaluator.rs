//! Match Evaluator: pluggable, trait-based scorer for one CV against one job.
//!
//! Default: `LlmMatchEvaluator` (prompt → chat completion → decoder).
//! Tests substitute their own implementation.
//!
//! `AppState` holds an `Arc<dyn MatchEvaluator>`.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, LlmError, ResponseMode};
use crate::matching::decoder::{decode_lenient, decode_strict, DecodeError};
use crate::matching::prompts::build_match_prompt;
use crate::models::analysis::MatchAssessment;

/// The evaluator trait. Implement this to swap backends without touching
/// the batch runner or handlers.
#[async_trait]
pub trait MatchEvaluator: Send + Sync {
    async fn evaluate(&self, job_text: &str, cv_text: &str) -> Result<MatchAssessment, AppError>;
}

/// Why one evaluation attempt produced no assessment.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<AttemptError> for AppError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Llm(e) => AppError::Llm(format!("CV evaluation failed: {e}")),
            AttemptError::Decode(e) => AppError::Llm(e.to_string()),
        }
    }
}

/// Evaluates via the language model.
///
/// Algorithm:
/// 1. Ask for `json_object` output and decode the whole reply strictly.
/// 2. On any failure of step 1, ask again in free-text mode and decode the
///    first brace-delimited object leniently.
/// 3. If step 2 fails too, the error propagates to the caller.
pub struct LlmMatchEvaluator {
    llm: LlmClient,
}

impl LlmMatchEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    async fn evaluate_structured(&self, prompt: &str) -> Result<MatchAssessment, AttemptError> {
        let text = self
            .llm
            .call_text(prompt, JSON_ONLY_SYSTEM, ResponseMode::JsonObject)
            .await?;
        Ok(decode_strict(&text)?)
    }

    async fn evaluate_free_text(&self, prompt: &str) -> Result<MatchAssessment, AttemptError> {
        let text = self
            .llm
            .call_text(prompt, JSON_ONLY_SYSTEM, ResponseMode::Text)
            .await?;
        Ok(decode_lenient(&text)?)
    }
}

#[async_trait]
impl MatchEvaluator for LlmMatchEvaluator {
    async fn evaluate(&self, job_text: &str, cv_text: &str) -> Result<MatchAssessment, AppError> {
        let prompt = build_match_prompt(job_text, cv_text);

        match self.evaluate_structured(&prompt).await {
            Ok(assessment) => Ok(assessment),
            Err(reason) => {
                warn!(
                    model = self.llm.model(),
                    error = ?reason,
                    "Structured evaluation failed; retrying in free-text mode"
                );
                let assessment = self.evaluate_free_text(&prompt).await?;
                info!("Free-text fallback produced an assessment");
                Ok(assessment)
            }
        }
    }
}
