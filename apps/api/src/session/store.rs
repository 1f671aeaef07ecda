//! Per-session state and every transition a recruiter action can apply to it.
//!
//! `SessionState` is a plain value: handlers lock it, call one method, and
//! render a view from it. Nothing here performs I/O.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::matching::batch::ItemOutcome;
use crate::models::analysis::AnalysisEntry;

pub const DEFAULT_THRESHOLD: u8 = 75;
pub const MAX_COMPARE: usize = 5;
const UPLOADER_KEY_PREFIX: &str = "cv_uploader_";

/// Submission lifecycle of one session.
///
/// `Idle` → `Submitting` (batch in flight) → `Rendered` (results available).
/// Clear and reset return to `Idle`, and are refused while `Submitting`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Submitting,
    Rendered,
}

/// The last submitted form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormDraft {
    pub job_text: String,
    pub cv_text: String,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Every entry ever produced in this session, oldest first.
    pub history: Vec<AnalysisEntry>,
    /// The most recent batch, highest score first.
    pub ranking: Vec<AnalysisEntry>,
    pub selected_id: Option<String>,
    pub compare_ids: Vec<String>,
    pub threshold: u8,
    pub draft: FormDraft,
    uploader_generation: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            history: Vec::new(),
            ranking: Vec::new(),
            selected_id: None,
            compare_ids: Vec::new(),
            threshold: DEFAULT_THRESHOLD,
            draft: FormDraft::default(),
            uploader_generation: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the upload widget; changes on every full reset so the client
    /// drops its selected files.
    pub fn uploader_key(&self) -> String {
        format!("{UPLOADER_KEY_PREFIX}{}", self.uploader_generation)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Submission
    // ────────────────────────────────────────────────────────────────────────

    fn ensure_idle_submitter(&self) -> Result<(), AppError> {
        if self.phase == SessionPhase::Submitting {
            return Err(AppError::Conflict(
                "An analysis is already running for this session".to_string(),
            ));
        }
        Ok(())
    }

    pub fn begin_submission(&mut self, draft: FormDraft) -> Result<(), AppError> {
        self.ensure_idle_submitter()?;
        self.draft = draft;
        self.phase = SessionPhase::Submitting;
        Ok(())
    }

    /// Installs a finished batch: the ranking is replaced by the batch sorted
    /// by descending score (stable, so ties keep input order), every entry is
    /// appended to history in that order, the comparison is cleared and the
    /// last appended entry becomes the selection.
    ///
    /// A batch arriving outside `Submitting` has no submission to belong to
    /// and is dropped.
    pub fn commit_batch(&mut self, outcomes: Vec<ItemOutcome>) {
        if self.phase != SessionPhase::Submitting {
            warn!(
                batch = outcomes.len(),
                phase = ?self.phase,
                "Dropping analysis batch with no submission in flight"
            );
            return;
        }
        let mut batch: Vec<AnalysisEntry> =
            outcomes.into_iter().map(ItemOutcome::into_entry).collect();
        batch.sort_by_key(|entry| Reverse(entry.overall_score()));

        if let Some(last) = batch.last() {
            self.selected_id = Some(last.id.clone());
        }
        self.history.extend(batch.iter().cloned());
        self.ranking = batch;
        self.compare_ids.clear();
        self.phase = SessionPhase::Rendered;

        info!(
            batch = self.ranking.len(),
            history = self.history.len(),
            "Committed analysis batch"
        );
    }

    /// Leaves `Submitting` without results.
    pub fn abort_submission(&mut self) {
        if self.phase == SessionPhase::Submitting {
            self.phase = if self.ranking.is_empty() {
                SessionPhase::Idle
            } else {
                SessionPhase::Rendered
            };
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Read-side queries
    // ────────────────────────────────────────────────────────────────────────

    /// Ranked entries scoring at or above the threshold.
    pub fn shortlist(&self) -> Vec<&AnalysisEntry> {
        self.ranking
            .iter()
            .filter(|entry| entry.overall_score() >= self.threshold)
            .collect()
    }

    /// The selected entry, looked up in history.
    pub fn selected(&self) -> Option<&AnalysisEntry> {
        let id = self.selected_id.as_deref()?;
        self.history.iter().find(|entry| entry.id == id)
    }

    /// Entries chosen for side-by-side comparison, in selection order.
    pub fn comparison(&self) -> Vec<&AnalysisEntry> {
        self.compare_ids
            .iter()
            .filter_map(|id| self.ranking.iter().find(|entry| &entry.id == id))
            .collect()
    }

    pub fn find_entry(&self, entry_id: &str) -> Result<&AnalysisEntry, AppError> {
        self.history
            .iter()
            .find(|entry| entry.id == entry_id)
            .ok_or_else(|| AppError::NotFound(format!("Entry {entry_id} not found")))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Pure transitions
    // ────────────────────────────────────────────────────────────────────────

    pub fn set_threshold(&mut self, threshold: i64) -> Result<(), AppError> {
        let threshold = u8::try_from(threshold)
            .ok()
            .filter(|t| *t <= 100)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Shortlist threshold must be between 0 and 100, got {threshold}"
                ))
            })?;
        self.threshold = threshold;
        Ok(())
    }

    pub fn select(&mut self, entry_id: &str) -> Result<(), AppError> {
        self.find_entry(entry_id)?;
        self.selected_id = Some(entry_id.to_string());
        Ok(())
    }

    /// Replaces the comparison selection. Order is preserved, duplicates are
    /// dropped and the list is cut to the first `MAX_COMPARE` ids. Every id
    /// must belong to the current ranking.
    pub fn set_comparison(&mut self, entry_ids: &[String]) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for id in entry_ids {
            if !self.ranking.iter().any(|entry| &entry.id == id) {
                return Err(AppError::NotFound(format!(
                    "Entry {id} is not part of the current ranking"
                )));
            }
            if seen.insert(id.as_str()) {
                ids.push(id.clone());
            }
        }
        ids.truncate(MAX_COMPARE);
        self.compare_ids = ids;
        Ok(())
    }

    /// Updates the notes on the first matching entry in history and in the ranking.
    pub fn update_notes(&mut self, entry_id: &str, notes: &str) -> Result<(), AppError> {
        let in_history = self.history.iter_mut().find(|entry| entry.id == entry_id);
        let found_in_history = match in_history {
            Some(entry) => {
                entry.recruiter_notes = notes.to_string();
                true
            }
            None => false,
        };

        let in_ranking = self.ranking.iter_mut().find(|entry| entry.id == entry_id);
        let found_in_ranking = match in_ranking {
            Some(entry) => {
                entry.recruiter_notes = notes.to_string();
                true
            }
            None => false,
        };

        if found_in_history || found_in_ranking {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Entry {entry_id} not found")))
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Session controls
    // ────────────────────────────────────────────────────────────────────────

    /// Wipes the form, ranking, selection and comparison. History and the
    /// upload key survive.
    pub fn clear_inputs(&mut self) -> Result<(), AppError> {
        self.ensure_idle_submitter()?;
        self.draft = FormDraft::default();
        self.ranking.clear();
        self.selected_id = None;
        self.compare_ids.clear();
        self.phase = SessionPhase::Idle;
        Ok(())
    }

    /// `clear_inputs` plus an empty history and a fresh upload key.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.clear_inputs()?;
        self.history.clear();
        self.uploader_generation += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{MatchAssessment, Recommendation};

    fn entry(source: &str, score: u8) -> AnalysisEntry {
        AnalysisEntry::evaluated(
            "Go engineer",
            source,
            MatchAssessment {
                overall_score: score,
                recommendation: Recommendation::Maybe,
                ..MatchAssessment::default()
            },
        )
    }

    fn outcomes(scores: &[(&str, u8)]) -> Vec<ItemOutcome> {
        scores
            .iter()
            .map(|(source, score)| ItemOutcome::Evaluated(entry(source, *score)))
            .collect()
    }

    fn state_with_batch(scores: &[(&str, u8)]) -> SessionState {
        let mut state = SessionState::new();
        state.begin_submission(FormDraft::default()).unwrap();
        state.commit_batch(outcomes(scores));
        state
    }

    fn ranking_ids(state: &SessionState) -> Vec<String> {
        state.ranking.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_new_session_defaults() {
        let state = SessionState::new();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert_eq!(state.threshold, 75);
        assert_eq!(state.uploader_key(), "cv_uploader_0");
        assert!(state.selected().is_none());
    }

    #[test]
    fn test_commit_sorts_by_score_with_stable_ties() {
        let state = state_with_batch(&[("a", 60), ("b", 90), ("c", 60), ("d", 75)]);
        let sources: Vec<&str> = state.ranking.iter().map(|e| e.cv_source.as_str()).collect();
        assert_eq!(sources, vec!["b", "d", "a", "c"]);
        assert_eq!(state.phase, SessionPhase::Rendered);
    }

    #[test]
    fn test_commit_appends_history_and_selects_last() {
        let mut state = state_with_batch(&[("a", 10), ("b", 20)]);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.selected().unwrap().cv_source, "a");

        state.set_comparison(&ranking_ids(&state)).unwrap();
        state.begin_submission(FormDraft::default()).unwrap();
        state.commit_batch(outcomes(&[("c", 50), ("d", 40), ("e", 45)]));

        assert_eq!(state.history.len(), 5);
        assert_eq!(state.ranking.len(), 3);
        assert!(state.compare_ids.is_empty());
        assert_eq!(state.selected().unwrap().cv_source, "d");
        let history_sources: Vec<&str> =
            state.history.iter().map(|e| e.cv_source.as_str()).collect();
        assert_eq!(history_sources, vec!["b", "a", "c", "e", "d"]);
    }

    #[test]
    fn test_concurrent_submission_is_rejected() {
        let mut state = SessionState::new();
        state.begin_submission(FormDraft::default()).unwrap();
        let err = state.begin_submission(FormDraft::default()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_abort_returns_to_previous_phase() {
        let mut state = SessionState::new();
        state.begin_submission(FormDraft::default()).unwrap();
        state.abort_submission();
        assert_eq!(state.phase, SessionPhase::Idle);

        let mut state = state_with_batch(&[("a", 10)]);
        state.begin_submission(FormDraft::default()).unwrap();
        state.abort_submission();
        assert_eq!(state.phase, SessionPhase::Rendered);
    }

    #[test]
    fn test_shortlist_matches_threshold_predicate_for_every_threshold() {
        let mut state = state_with_batch(&[("a", 0), ("b", 50), ("c", 75), ("d", 100)]);
        for threshold in 0..=100u8 {
            state.set_threshold(i64::from(threshold)).unwrap();
            let expected = state
                .ranking
                .iter()
                .filter(|e| e.overall_score() >= threshold)
                .count();
            assert_eq!(state.shortlist().len(), expected, "threshold {threshold}");
        }
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let mut state = SessionState::new();
        assert!(state.set_threshold(101).is_err());
        assert!(state.set_threshold(-1).is_err());
        assert_eq!(state.threshold, 75);
        state.set_threshold(0).unwrap();
        assert_eq!(state.threshold, 0);
    }

    #[test]
    fn test_select_requires_a_history_entry() {
        let mut state = state_with_batch(&[("a", 10), ("b", 20)]);
        let first = state.history[0].id.clone();
        state.select(&first).unwrap();
        assert_eq!(state.selected().unwrap().cv_source, "b");

        let err = state.select("missing").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(state.selected_id.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_comparison_selection_is_truncated_to_five() {
        let mut state = state_with_batch(&[
            ("a", 90),
            ("b", 80),
            ("c", 70),
            ("d", 60),
            ("e", 50),
            ("f", 40),
        ]);
        let ids = ranking_ids(&state);

        state.set_comparison(&ids[..2]).unwrap();
        assert_eq!(state.comparison().len(), 2);
        state.set_comparison(&ids[..3]).unwrap();
        assert_eq!(state.comparison().len(), 3);
        state.set_comparison(&ids).unwrap();
        assert_eq!(state.compare_ids, ids[..5].to_vec());
    }

    #[test]
    fn test_comparison_drops_duplicates_and_rejects_unknown_ids() {
        let mut state = state_with_batch(&[("a", 90), ("b", 80)]);
        let ids = ranking_ids(&state);

        state
            .set_comparison(&[ids[1].clone(), ids[0].clone(), ids[1].clone()])
            .unwrap();
        assert_eq!(state.compare_ids, vec![ids[1].clone(), ids[0].clone()]);

        let err = state.set_comparison(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(state.compare_ids.len(), 2);
    }

    #[test]
    fn test_notes_update_both_copies_and_leave_report_untouched() {
        let mut state = state_with_batch(&[("a", 90)]);
        let id = state.ranking[0].id.clone();
        let report_before = state.ranking[0].report_text.clone();

        state.update_notes(&id, "Call Tuesday").unwrap();
        assert_eq!(state.history[0].recruiter_notes, "Call Tuesday");
        assert_eq!(state.ranking[0].recruiter_notes, "Call Tuesday");
        assert_eq!(state.ranking[0].report_text, report_before);

        assert!(state.update_notes("missing", "x").is_err());
    }

    #[test]
    fn test_clear_inputs_keeps_history_and_upload_key() {
        let mut state = state_with_batch(&[("a", 90), ("b", 10)]);
        state.draft.job_text = "job".into();
        state.clear_inputs().unwrap();

        assert_eq!(state.history.len(), 2);
        assert!(state.ranking.is_empty());
        assert!(state.selected_id.is_none());
        assert!(state.draft.job_text.is_empty());
        assert_eq!(state.uploader_key(), "cv_uploader_0");
        assert_eq!(state.phase, SessionPhase::Idle);
    }

    #[test]
    fn test_reset_empties_history_and_rekeys_uploader() {
        let mut state = state_with_batch(&[("a", 90)]);
        state.set_threshold(40).unwrap();
        state.reset().unwrap();
        assert!(state.history.is_empty());
        assert_eq!(state.uploader_key(), "cv_uploader_1");
        state.reset().unwrap();
        assert_eq!(state.uploader_key(), "cv_uploader_2");
        // the threshold is a preference, not an input
        assert_eq!(state.threshold, 40);
    }

    #[test]
    fn test_controls_wait_for_the_running_batch() {
        let mut state = state_with_batch(&[("old", 30)]);
        state.begin_submission(FormDraft::default()).unwrap();

        assert!(matches!(state.reset(), Err(AppError::Conflict(_))));
        assert!(matches!(state.clear_inputs(), Err(AppError::Conflict(_))));
        assert_eq!(state.phase, SessionPhase::Submitting);
        assert_eq!(state.uploader_key(), "cv_uploader_0");
        assert_eq!(state.history.len(), 1);

        // still in flight, so a second submission is refused
        let err = state.begin_submission(FormDraft::default()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        state.commit_batch(outcomes(&[("new", 80)]));
        assert_eq!(state.phase, SessionPhase::Rendered);
        assert_eq!(state.history.len(), 2);

        state.reset().unwrap();
        assert!(state.history.is_empty());
        assert_eq!(state.phase, SessionPhase::Idle);
    }

    #[test]
    fn test_batch_without_submission_is_dropped() {
        let mut state = state_with_batch(&[("a", 30)]);
        state.reset().unwrap();
        state.commit_batch(outcomes(&[("late", 90)]));

        assert!(state.history.is_empty());
        assert!(state.ranking.is_empty());
        assert!(state.selected_id.is_none());
        assert_eq!(state.phase, SessionPhase::Idle);
    }
}
