//! Decoder for the evaluator's JSON reply.
//!
//! Two stages:
//! 1. `decode_strict`: the whole reply must be a JSON object.
//! 2. `decode_lenient`: strip code fences, then take the first `{` through the
//!    last `}` and parse that.
//!
//! Either stage hands the object to `MatchAssessment`'s `Deserialize` impl, whose
//! `deserialize_with` helpers below coerce every field instead of rejecting it.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::strip_json_fences;
use crate::models::analysis::{MatchAssessment, Recommendation};

const MAX_SCORE: i64 = 100;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Model did not return JSON.")]
    NoJson,

    #[error("Model reply is not a JSON object")]
    NotAnObject,

    #[error("Malformed JSON in model reply: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parses the reply as-is. Succeeds only when the entire text is a JSON object.
pub fn decode_strict(text: &str) -> Result<MatchAssessment, DecodeError> {
    let value: Value = serde_json::from_str(text.trim())?;
    from_object(value)
}

/// Locates the first brace-delimited object inside free text and parses it.
pub fn decode_lenient(text: &str) -> Result<MatchAssessment, DecodeError> {
    let text = strip_json_fences(text);
    let candidate = first_json_object(text).ok_or(DecodeError::NoJson)?;
    let value: Value = serde_json::from_str(candidate)?;
    from_object(value)
}

fn from_object(value: Value) -> Result<MatchAssessment, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(MatchAssessment::deserialize(value)?)
}

/// Greedy `{...}` match spanning newlines: first opening brace to last closing brace.
fn first_json_object(text: &str) -> Option<&str> {
    static OBJECT_RE: OnceLock<Regex> = OnceLock::new();
    let re = OBJECT_RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));
    re.find(text).map(|m| m.as_str())
}

// ────────────────────────────────────────────────────────────────────────────
// Field coercion helpers (used via `#[serde(deserialize_with = ...)]`)
// ────────────────────────────────────────────────────────────────────────────

/// Integer 0–100. Accepts integers, floats (truncated) and numeric strings;
/// anything else is 0. Out-of-range values are clamped.
pub fn lenient_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_score(&value))
}

pub fn coerce_score(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    };
    raw.unwrap_or(0).clamp(0, MAX_SCORE) as u8
}

/// List of short strings. Arrays keep their string, number and bool items;
/// a bare non-empty string becomes a one-element list; everything else is empty.
pub fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_list(&value))
}

pub fn coerce_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => vec![],
    }
}

pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value).unwrap_or_default())
}

pub fn lenient_recommendation<'de, D>(deserializer: D) -> Result<Recommendation, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Recommendation::coerce(&s),
        _ => Recommendation::default(),
    })
}

/// Nested object with its own lenient fields; non-objects become `T::default()`.
pub fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_object() {
        Ok(T::deserialize(value).unwrap_or_default())
    } else {
        Ok(T::default())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FULL_REPLY: &str = r#"{
        "overall_score": 82,
        "recommendation": "Yes",
        "subscores": {"skills": 85, "experience": 80, "tools": 75, "domain": 70},
        "explainable_score": {
            "why_this_score": ["Strong Go background"],
            "top_evidence": ["5 years Go at Acme"]
        },
        "strengths": ["Go", "Distributed systems"],
        "gaps_risks": ["No Kubernetes"],
        "missing_keywords": ["Kubernetes"],
        "interview_guide": {"critical": ["Probe k8s exposure"], "nice_to_have": ["Helm"]},
        "cv_improvements": ["Quantify impact"],
        "summary": "Solid backend engineer."
    }"#;

    #[test]
    fn test_strict_decodes_full_schema() {
        let a = decode_strict(FULL_REPLY).unwrap();
        assert_eq!(a.overall_score, 82);
        assert_eq!(a.recommendation, Recommendation::Yes);
        assert_eq!(a.subscores.skills, 85);
        assert_eq!(a.subscores.domain, 70);
        assert_eq!(a.explainable_score.top_evidence, vec!["5 years Go at Acme"]);
        assert_eq!(a.missing_keywords, vec!["Kubernetes"]);
        assert_eq!(a.interview_guide.nice_to_have, vec!["Helm"]);
        assert_eq!(a.summary, "Solid backend engineer.");
    }

    #[test]
    fn test_strict_rejects_prose() {
        let err = decode_strict("Here is the result: {\"overall_score\": 50}").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_strict_rejects_non_object_json() {
        let err = decode_strict("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject));
    }

    #[test]
    fn test_lenient_extracts_object_from_prose() {
        let reply = "Sure! Here is my assessment:\n{\"overall_score\": 55,\n\"recommendation\": \"Maybe\"}\nHope this helps.";
        let a = decode_lenient(reply).unwrap();
        assert_eq!(a.overall_score, 55);
        assert_eq!(a.recommendation, Recommendation::Maybe);
    }

    #[test]
    fn test_lenient_handles_code_fences() {
        let reply = format!("```json\n{FULL_REPLY}\n```");
        let a = decode_lenient(&reply).unwrap();
        assert_eq!(a.overall_score, 82);
    }

    #[test]
    fn test_lenient_without_braces_reports_no_json() {
        let err = decode_lenient("I cannot evaluate this CV.").unwrap_err();
        assert!(matches!(err, DecodeError::NoJson));
        assert_eq!(err.to_string(), "Model did not return JSON.");
    }

    #[test]
    fn test_missing_fields_default() {
        let a = decode_strict("{}").unwrap();
        assert_eq!(a.overall_score, 0);
        assert_eq!(a.recommendation, Recommendation::Maybe);
        assert_eq!(a.subscores.skills, 0);
        assert!(a.strengths.is_empty());
        assert!(a.interview_guide.critical.is_empty());
        assert!(a.summary.is_empty());
    }

    #[test]
    fn test_wrong_types_are_coerced_not_rejected() {
        let reply = json!({
            "overall_score": "77",
            "recommendation": 5,
            "subscores": "high",
            "explainable_score": null,
            "strengths": "Go",
            "gaps_risks": [null, "No k8s", 3],
            "missing_keywords": {"a": 1},
            "interview_guide": {"critical": "Ask about k8s"},
            "summary": null
        })
        .to_string();
        let a = decode_strict(&reply).unwrap();
        assert_eq!(a.overall_score, 77);
        assert_eq!(a.recommendation, Recommendation::Maybe);
        assert_eq!(a.subscores, Default::default());
        assert_eq!(a.strengths, vec!["Go"]);
        assert_eq!(a.gaps_risks, vec!["No k8s", "3"]);
        assert!(a.missing_keywords.is_empty());
        assert_eq!(a.interview_guide.critical, vec!["Ask about k8s"]);
        assert!(a.summary.is_empty());
    }

    #[test]
    fn test_scores_are_clamped_and_truncated() {
        assert_eq!(coerce_score(&json!(150)), 100);
        assert_eq!(coerce_score(&json!(-20)), 0);
        assert_eq!(coerce_score(&json!(72.9)), 72);
        assert_eq!(coerce_score(&json!(" 64 ")), 64);
        assert_eq!(coerce_score(&json!("64.5")), 64);
        assert_eq!(coerce_score(&json!("eighty")), 0);
        assert_eq!(coerce_score(&json!(null)), 0);
        assert_eq!(coerce_score(&json!(u64::MAX)), 100);
    }

    #[test]
    fn test_score_always_in_range_and_recommendation_in_enum() {
        let replies = [
            json!({"overall_score": 1e9, "recommendation": "STRONG YES"}),
            json!({"overall_score": -1e9, "recommendation": "nope"}),
            json!({"overall_score": [1], "recommendation": ["Yes"]}),
            json!({"overall_score": true}),
        ];
        for reply in replies {
            let a = decode_strict(&reply.to_string()).unwrap();
            assert!(a.overall_score <= 100);
            assert!(Recommendation::ALL.contains(&a.recommendation));
        }
    }
}
