//! Read-only view models rendered from a `SessionState` after every action.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::analysis::{
    AnalysisEntry, EntryStatus, ExplainableScore, InterviewGuide, Recommendation, Subscores,
};
use crate::session::store::{FormDraft, SessionPhase, SessionState};

const COMPARE_TOP_ITEMS: usize = 5;
const COMPARE_KEYWORDS: usize = 12;
const DETAIL_KEYWORDS: usize = 30;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// The comparison panel only renders with at least this many candidates.
const MIN_COMPARE: usize = 2;

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub uploader_key: String,
    pub threshold: u8,
    pub draft: FormDraft,
    pub shortlist: Vec<ShortlistRow>,
    pub ranking_options: Vec<EntryOption>,
    pub compare_ids: Vec<String>,
    pub comparison: Option<Vec<ComparisonCard>>,
    pub selected: Option<CandidateDetail>,
    pub history: Vec<EntryOption>,
}

#[derive(Debug, Serialize)]
pub struct ShortlistRow {
    pub entry_id: String,
    pub score: u8,
    pub recommendation: Recommendation,
    pub candidate: String,
    pub missing_keywords_count: usize,
}

/// An id with its human-readable label, for pickers.
#[derive(Debug, Serialize)]
pub struct EntryOption {
    pub entry_id: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct ComparisonCard {
    pub entry_id: String,
    pub cv_source: String,
    pub score: u8,
    pub recommendation: Recommendation,
    pub top_strengths: Vec<String>,
    pub top_gaps: Vec<String>,
    pub missing_keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CandidateDetail {
    pub entry_id: String,
    pub cv_source: String,
    pub status: EntryStatus,
    pub timestamp: DateTime<Utc>,
    pub overall_score: u8,
    pub recommendation: Recommendation,
    pub subscores: Subscores,
    pub explainable_score: ExplainableScore,
    pub summary: String,
    pub missing_keywords: Vec<String>,
    pub interview_guide: InterviewGuide,
    pub recruiter_notes: String,
    pub report_text: String,
}

impl SessionView {
    pub fn render(state: &SessionState) -> Self {
        let comparison = state.comparison();
        let comparison = (comparison.len() >= MIN_COMPARE)
            .then(|| comparison.into_iter().map(ComparisonCard::from_entry).collect());

        Self {
            phase: state.phase,
            uploader_key: state.uploader_key(),
            threshold: state.threshold,
            draft: state.draft.clone(),
            shortlist: state.shortlist().into_iter().map(ShortlistRow::from_entry).collect(),
            ranking_options: state
                .ranking
                .iter()
                .map(|entry| EntryOption {
                    entry_id: entry.id.clone(),
                    label: ranking_label(entry),
                })
                .collect(),
            compare_ids: state.compare_ids.clone(),
            comparison,
            selected: state.selected().map(CandidateDetail::from_entry),
            history: state
                .history
                .iter()
                .enumerate()
                .map(|(index, entry)| EntryOption {
                    entry_id: entry.id.clone(),
                    label: history_label(index + 1, entry),
                })
                .collect(),
        }
    }
}

impl ShortlistRow {
    fn from_entry(entry: &AnalysisEntry) -> Self {
        Self {
            entry_id: entry.id.clone(),
            score: entry.overall_score(),
            recommendation: entry.recommendation(),
            candidate: entry.cv_source.clone(),
            missing_keywords_count: entry.assessment.missing_keywords.len(),
        }
    }
}

impl ComparisonCard {
    fn from_entry(entry: &AnalysisEntry) -> Self {
        let a = &entry.assessment;
        Self {
            entry_id: entry.id.clone(),
            cv_source: entry.cv_source.clone(),
            score: a.overall_score,
            recommendation: a.recommendation,
            top_strengths: first_n(&a.strengths, COMPARE_TOP_ITEMS),
            top_gaps: first_n(&a.gaps_risks, COMPARE_TOP_ITEMS),
            missing_keywords: first_n(&a.missing_keywords, COMPARE_KEYWORDS),
        }
    }
}

impl CandidateDetail {
    fn from_entry(entry: &AnalysisEntry) -> Self {
        let a = &entry.assessment;
        Self {
            entry_id: entry.id.clone(),
            cv_source: entry.cv_source.clone(),
            status: entry.status,
            timestamp: entry.timestamp,
            overall_score: a.overall_score,
            recommendation: a.recommendation,
            subscores: a.subscores.clone(),
            explainable_score: a.explainable_score.clone(),
            summary: a.summary.clone(),
            missing_keywords: first_n(&a.missing_keywords, DETAIL_KEYWORDS),
            interview_guide: a.interview_guide.clone(),
            recruiter_notes: entry.recruiter_notes.clone(),
            report_text: entry.report_text.clone(),
        }
    }
}

/// `"{score}/100 • {recommendation} • {source}"`
pub fn ranking_label(entry: &AnalysisEntry) -> String {
    format!(
        "{}/100 • {} • {}",
        entry.overall_score(),
        entry.recommendation(),
        entry.cv_source
    )
}

/// `"{n}. {timestamp} • {score}/100 • {recommendation} • {source}"`, n starting at 1.
pub fn history_label(position: usize, entry: &AnalysisEntry) -> String {
    format!(
        "{position}. {} • {}",
        entry.timestamp.format(TIMESTAMP_FORMAT),
        ranking_label(entry)
    )
}

fn first_n(items: &[String], n: usize) -> Vec<String> {
    items.iter().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::batch::ItemOutcome;
    use crate::models::analysis::MatchAssessment;

    fn entry(source: &str, score: u8, keywords: usize) -> AnalysisEntry {
        AnalysisEntry::evaluated(
            "job",
            source,
            MatchAssessment {
                overall_score: score,
                recommendation: Recommendation::Yes,
                strengths: (0..8).map(|i| format!("strength {i}")).collect(),
                missing_keywords: (0..keywords).map(|i| format!("kw{i}")).collect(),
                ..MatchAssessment::default()
            },
        )
    }

    fn state(entries: Vec<AnalysisEntry>) -> SessionState {
        let mut state = SessionState::new();
        state.begin_submission(FormDraft::default()).unwrap();
        state.commit_batch(entries.into_iter().map(ItemOutcome::Evaluated).collect());
        state
    }

    #[test]
    fn test_empty_session_view() {
        let view = SessionView::render(&SessionState::new());
        assert_eq!(view.phase, SessionPhase::Idle);
        assert_eq!(view.uploader_key, "cv_uploader_0");
        assert!(view.shortlist.is_empty() && view.history.is_empty());
        assert!(view.comparison.is_none() && view.selected.is_none());
    }

    #[test]
    fn test_labels() {
        let e = entry("cv.pdf (PDF)", 82, 0);
        assert_eq!(ranking_label(&e), "82/100 • Yes • cv.pdf (PDF)");

        let label = history_label(3, &e);
        let expected_ts = e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        assert_eq!(label, format!("3. {expected_ts} • 82/100 • Yes • cv.pdf (PDF)"));
    }

    #[test]
    fn test_shortlist_rows_follow_threshold() {
        let view = SessionView::render(&state(vec![entry("a", 80, 3), entry("b", 60, 1)]));
        assert_eq!(view.shortlist.len(), 1);
        assert_eq!(view.shortlist[0].candidate, "a");
        assert_eq!(view.shortlist[0].missing_keywords_count, 3);
        assert_eq!(view.ranking_options.len(), 2);
        assert_eq!(view.history[0].label.split(". ").next(), Some("1"));
    }

    #[test]
    fn test_comparison_requires_two_candidates() {
        let mut s = state(vec![entry("a", 80, 20), entry("b", 60, 1)]);
        let ids: Vec<String> = s.ranking.iter().map(|e| e.id.clone()).collect();

        s.set_comparison(&ids[..1]).unwrap();
        assert!(SessionView::render(&s).comparison.is_none());

        s.set_comparison(&ids).unwrap();
        let cards = SessionView::render(&s).comparison.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].top_strengths.len(), 5);
        assert_eq!(cards[0].missing_keywords.len(), 12);
    }

    #[test]
    fn test_detail_caps_missing_keywords() {
        let view = SessionView::render(&state(vec![entry("a", 80, 45)]));
        let detail = view.selected.unwrap();
        assert_eq!(detail.missing_keywords.len(), 30);
        assert_eq!(detail.cv_source, "a");
    }
}
