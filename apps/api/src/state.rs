use std::sync::Arc;

use crate::config::Config;
use crate::extract::CvExtractor;
use crate::matching::evaluator::MatchEvaluator;
use crate::session::registry::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionRegistry>,
    /// Pluggable evaluator. Default: LlmMatchEvaluator; tests use stubs.
    pub evaluator: Arc<dyn MatchEvaluator>,
    pub extractor: Arc<dyn CvExtractor>,
}
