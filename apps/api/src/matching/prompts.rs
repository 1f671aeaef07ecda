// All LLM prompt constants for the matching module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::GROUNDING_RULES;

/// Exact output schema the evaluator must return.
pub const MATCH_SCHEMA_INSTRUCTION: &str = r#"Return ONLY a valid JSON object with EXACTLY these keys:
{
  "overall_score": <integer 0-100>,
  "recommendation": <one of "Strong Yes","Yes","Maybe","No">,
  "subscores": {
    "skills": <0-100>,
    "experience": <0-100>,
    "tools": <0-100>,
    "domain": <0-100>
  },
  "explainable_score": {
    "why_this_score": [<bullet strings>],
    "top_evidence": [<short evidence strings referencing CV facts>]
  },
  "strengths": [<bullet strings>],
  "gaps_risks": [<bullet strings>],
  "missing_keywords": [<strings>],
  "interview_guide": {
    "critical": [<questions/checks>],
    "nice_to_have": [<questions/checks>]
  },
  "cv_improvements": [<bullet strings>],
  "summary": <1-2 sentence executive summary>
}"#;

/// Role and task framing that opens every evaluation prompt.
const MATCH_PROMPT_HEADER: &str = "You are a senior HR Talent Intelligence analyst.

Task: Assess CV vs Job Description with a factual, explainable evaluation.";

/// Builds the evaluation prompt. Job and CV text are interpolated verbatim,
/// never scanned for placeholders.
pub fn build_match_prompt(job_text: &str, cv_text: &str) -> String {
    format!(
        "{MATCH_PROMPT_HEADER}\n{MATCH_SCHEMA_INSTRUCTION}\n\n{GROUNDING_RULES}\n\nJOB DESCRIPTION:\n{}\n\nCANDIDATE CV:\n{}",
        job_text.trim(),
        cv_text.trim()
    )
}
