use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::matching::decoder::{
    lenient_list, lenient_object, lenient_recommendation, lenient_score, lenient_text,
};
use crate::matching::report::render_report;

/// Characters of the trimmed job text that feed the id of an evaluated entry.
const JOB_PREFIX_EVALUATED: usize = 160;
/// Characters of the trimmed job text that feed the id of a failed entry.
const JOB_PREFIX_FAILED: usize = 120;
const ID_HEX_LEN: usize = 12;

/// Categorical hiring suggestion returned by the evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Yes")]
    StrongYes,
    Yes,
    #[default]
    Maybe,
    No,
}

impl Recommendation {
    pub const ALL: [Recommendation; 4] = [
        Recommendation::StrongYes,
        Recommendation::Yes,
        Recommendation::Maybe,
        Recommendation::No,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Recommendation::StrongYes => "Strong Yes",
            Recommendation::Yes => "Yes",
            Recommendation::Maybe => "Maybe",
            Recommendation::No => "No",
        }
    }

    /// Case- and whitespace-insensitive match against the four labels.
    /// Anything unrecognised falls back to `Maybe`.
    pub fn coerce(raw: &str) -> Self {
        let normalized: String = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.label().to_lowercase() == normalized)
            .unwrap_or_default()
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscores {
    #[serde(default, deserialize_with = "lenient_score")]
    pub skills: u8,
    #[serde(default, deserialize_with = "lenient_score")]
    pub experience: u8,
    #[serde(default, deserialize_with = "lenient_score")]
    pub tools: u8,
    #[serde(default, deserialize_with = "lenient_score")]
    pub domain: u8,
}

/// Evidence and reasoning bullets accompanying the numeric score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainableScore {
    #[serde(default, deserialize_with = "lenient_list")]
    pub why_this_score: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub top_evidence: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewGuide {
    #[serde(default, deserialize_with = "lenient_list")]
    pub critical: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub nice_to_have: Vec<String>,
}

/// The structured verdict for one CV against one job description.
///
/// Deserialization is lenient field by field: the model's reply is coerced
/// into this shape rather than rejected (see `matching::decoder`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAssessment {
    #[serde(default, deserialize_with = "lenient_score")]
    pub overall_score: u8,
    #[serde(default, deserialize_with = "lenient_recommendation")]
    pub recommendation: Recommendation,
    #[serde(default, deserialize_with = "lenient_object")]
    pub subscores: Subscores,
    #[serde(default, deserialize_with = "lenient_object")]
    pub explainable_score: ExplainableScore,
    #[serde(default, deserialize_with = "lenient_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub gaps_risks: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub missing_keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub interview_guide: InterviewGuide,
    #[serde(default, deserialize_with = "lenient_list")]
    pub cv_improvements: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Evaluated,
    ExtractionFailed,
    EvaluationFailed,
}

impl EntryStatus {
    fn id_tag(self) -> &'static str {
        match self {
            EntryStatus::Evaluated => "",
            EntryStatus::ExtractionFailed => "extract_error",
            EntryStatus::EvaluationFailed => "evaluation_error",
        }
    }
}

/// One CV's evaluation result as stored in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub cv_source: String,
    pub status: EntryStatus,
    #[serde(flatten)]
    pub assessment: MatchAssessment,
    pub recruiter_notes: String,
    /// Markdown rendering of `assessment`; never includes the notes.
    pub report_text: String,
}

impl AnalysisEntry {
    /// Builds an entry from a successful evaluation.
    pub fn evaluated(job_text: &str, cv_source: &str, assessment: MatchAssessment) -> Self {
        let score = assessment.overall_score.to_string();
        let id = stable_id(&[
            &job_prefix(job_text, JOB_PREFIX_EVALUATED),
            cv_source,
            &score,
            assessment.recommendation.label(),
        ]);
        let report_text = render_report(cv_source, &assessment);

        Self {
            id,
            timestamp: Utc::now(),
            cv_source: cv_source.to_string(),
            status: EntryStatus::Evaluated,
            assessment,
            recruiter_notes: String::new(),
            report_text,
        }
    }

    /// Zero-score placeholder for a CV whose text could not be extracted.
    pub fn extraction_failed(job_text: &str, file_name: &str, reason: &str) -> Self {
        let assessment = MatchAssessment {
            recommendation: Recommendation::No,
            summary: "Extraction failed.".to_string(),
            gaps_risks: vec![format!("Failed to extract CV text: {reason}")],
            interview_guide: InterviewGuide {
                critical: vec!["Re-upload as DOCX or paste text".to_string()],
                nice_to_have: vec![],
            },
            explainable_score: ExplainableScore {
                why_this_score: vec!["No text extracted".to_string()],
                top_evidence: vec![],
            },
            ..MatchAssessment::default()
        };
        Self::failed(job_text, file_name, EntryStatus::ExtractionFailed, assessment)
    }

    /// Zero-score placeholder for a CV the model could not evaluate.
    pub fn evaluation_failed(job_text: &str, cv_source: &str, reason: &str) -> Self {
        let assessment = MatchAssessment {
            recommendation: Recommendation::No,
            summary: "Evaluation failed.".to_string(),
            gaps_risks: vec![format!("Failed to evaluate CV: {reason}")],
            interview_guide: InterviewGuide {
                critical: vec!["Re-run the analysis or paste the CV text".to_string()],
                nice_to_have: vec![],
            },
            explainable_score: ExplainableScore {
                why_this_score: vec!["No evaluation returned by the model".to_string()],
                top_evidence: vec![],
            },
            ..MatchAssessment::default()
        };
        Self::failed(job_text, cv_source, EntryStatus::EvaluationFailed, assessment)
    }

    fn failed(
        job_text: &str,
        cv_source: &str,
        status: EntryStatus,
        assessment: MatchAssessment,
    ) -> Self {
        let id = stable_id(&[
            &job_prefix(job_text, JOB_PREFIX_FAILED),
            cv_source,
            status.id_tag(),
        ]);
        let report_text = assessment.summary.clone();

        Self {
            id,
            timestamp: Utc::now(),
            cv_source: cv_source.to_string(),
            status,
            assessment,
            recruiter_notes: String::new(),
            report_text,
        }
    }

    pub fn overall_score(&self) -> u8 {
        self.assessment.overall_score
    }

    pub fn recommendation(&self) -> Recommendation {
        self.assessment.recommendation
    }
}

/// Deterministic short id: SHA-256 over the `||`-joined parts, first 12 hex chars.
pub fn stable_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parts.join("||").as_bytes());
    let digest = hasher.finalize();
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(ID_HEX_LEN);
    hex
}

fn job_prefix(job_text: &str, chars: usize) -> String {
    job_text.trim().chars().take(chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = "Senior backend engineer, Go, Kubernetes";

    fn assessment(score: u8, recommendation: Recommendation) -> MatchAssessment {
        MatchAssessment {
            overall_score: score,
            recommendation,
            summary: "Solid Go background.".into(),
            ..MatchAssessment::default()
        }
    }

    #[test]
    fn test_stable_id_is_deterministic_and_short() {
        let a = stable_id(&["job", "cv.pdf (PDF)", "80", "Yes"]);
        let b = stable_id(&["job", "cv.pdf (PDF)", "80", "Yes"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stable_id_changes_with_every_component() {
        let base = stable_id(&["job", "cv.pdf (PDF)", "80", "Yes"]);
        assert_ne!(base, stable_id(&["job2", "cv.pdf (PDF)", "80", "Yes"]));
        assert_ne!(base, stable_id(&["job", "other.pdf (PDF)", "80", "Yes"]));
        assert_ne!(base, stable_id(&["job", "cv.pdf (PDF)", "81", "Yes"]));
        assert_ne!(base, stable_id(&["job", "cv.pdf (PDF)", "80", "Maybe"]));
    }

    #[test]
    fn test_evaluated_entries_share_id_for_identical_inputs() {
        let a = AnalysisEntry::evaluated(JOB, "cv.pdf (PDF)", assessment(70, Recommendation::Yes));
        let b = AnalysisEntry::evaluated(JOB, "cv.pdf (PDF)", assessment(70, Recommendation::Yes));
        assert_eq!(a.id, b.id);

        let c = AnalysisEntry::evaluated(JOB, "cv.pdf (PDF)", assessment(71, Recommendation::Yes));
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_job_prefix_only_uses_first_160_chars() {
        let long_a = format!("{}{}", "x".repeat(160), "tail A");
        let long_b = format!("{}{}", "x".repeat(160), "tail B");
        let a = AnalysisEntry::evaluated(&long_a, "cv", assessment(50, Recommendation::Maybe));
        let b = AnalysisEntry::evaluated(&long_b, "cv", assessment(50, Recommendation::Maybe));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_evaluated_entry_prerenders_report_without_notes() {
        let entry = AnalysisEntry::evaluated(JOB, "Pasted text", assessment(64, Recommendation::Maybe));
        assert!(entry.report_text.contains("- Source: Pasted text"));
        assert!(entry.report_text.contains("64"));
        assert!(entry.recruiter_notes.is_empty());
        assert_eq!(entry.status, EntryStatus::Evaluated);
    }

    #[test]
    fn test_extraction_failed_entry_shape() {
        let entry = AnalysisEntry::extraction_failed(JOB, "scan.pdf", "no text layer");
        assert_eq!(entry.overall_score(), 0);
        assert_eq!(entry.recommendation(), Recommendation::No);
        assert_eq!(entry.cv_source, "scan.pdf");
        assert_eq!(entry.report_text, "Extraction failed.");
        assert_eq!(
            entry.assessment.gaps_risks,
            vec!["Failed to extract CV text: no text layer".to_string()]
        );
        assert_eq!(
            entry.assessment.interview_guide.critical,
            vec!["Re-upload as DOCX or paste text".to_string()]
        );
        assert_eq!(entry.status, EntryStatus::ExtractionFailed);
    }

    #[test]
    fn test_failure_ids_differ_by_kind() {
        let a = AnalysisEntry::extraction_failed(JOB, "cv.pdf", "x");
        let b = AnalysisEntry::evaluation_failed(JOB, "cv.pdf", "x");
        assert_ne!(a.id, b.id);
        assert_eq!(b.status, EntryStatus::EvaluationFailed);
    }

    #[test]
    fn test_recommendation_coercion() {
        assert_eq!(Recommendation::coerce("Strong Yes"), Recommendation::StrongYes);
        assert_eq!(Recommendation::coerce("  strong   yes "), Recommendation::StrongYes);
        assert_eq!(Recommendation::coerce("NO"), Recommendation::No);
        assert_eq!(Recommendation::coerce("yes"), Recommendation::Yes);
        assert_eq!(Recommendation::coerce("Definitely"), Recommendation::Maybe);
        assert_eq!(Recommendation::coerce(""), Recommendation::Maybe);
    }

    #[test]
    fn test_recommendation_serializes_with_display_labels() {
        let json = serde_json::to_string(&Recommendation::StrongYes).unwrap();
        assert_eq!(json, r#""Strong Yes""#);
        assert_eq!(Recommendation::No.to_string(), "No");
    }

    #[test]
    fn test_entry_serializes_flat() {
        let entry = AnalysisEntry::evaluated(JOB, "cv", assessment(90, Recommendation::StrongYes));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["overall_score"], 90);
        assert_eq!(value["recommendation"], "Strong Yes");
        assert_eq!(value["status"], "evaluated");
        assert!(value.get("assessment").is_none());
    }
}
