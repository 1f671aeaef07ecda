//! Markdown report rendering for a single assessment.
//!
//! `render_report` is pure: the same assessment always yields byte-identical
//! output. Recruiter notes are appended separately by `with_recruiter_notes`
//! at copy/export time and never stored back into `report_text`.

use crate::models::analysis::MatchAssessment;

const EMPTY_PLACEHOLDER: &str = "—";

pub fn render_report(cv_source: &str, assessment: &MatchAssessment) -> String {
    let subs = &assessment.subscores;
    let expl = &assessment.explainable_score;
    let guide = &assessment.interview_guide;
    let summary = if assessment.summary.trim().is_empty() {
        EMPTY_PLACEHOLDER
    } else {
        assessment.summary.trim()
    };

    let report = format!(
        "## Candidate
- Source: {cv_source}

## Overall match score
{score}

## Recommendation
{recommendation}

## Explainable score
**Subscores**
- Skills: {skills}
- Experience: {experience}
- Tools: {tools}
- Domain: {domain}

**Why this score**
{why}

**Top evidence**
{evidence}

## Executive summary
{summary}

## Key strengths
{strengths}

## Gaps & risks
{gaps}

## Missing keywords / requirements
{missing}

## Interview guide (focused on gaps)
**Critical**
{critical}

**Nice-to-have**
{nice_to_have}

## CV improvement suggestions
{improvements}
",
        score = assessment.overall_score,
        recommendation = assessment.recommendation,
        skills = subs.skills,
        experience = subs.experience,
        tools = subs.tools,
        domain = subs.domain,
        why = bullets(&expl.why_this_score),
        evidence = bullets(&expl.top_evidence),
        strengths = bullets(&assessment.strengths),
        gaps = bullets(&assessment.gaps_risks),
        missing = bullets(&assessment.missing_keywords),
        critical = bullets(&guide.critical),
        nice_to_have = bullets(&guide.nice_to_have),
        improvements = bullets(&assessment.cv_improvements),
    );

    report.trim().to_string()
}

/// Report text plus a "Recruiter notes" section when notes are non-blank.
pub fn with_recruiter_notes(report_text: &str, notes: &str) -> String {
    let base = report_text.trim();
    let notes = notes.trim();
    if notes.is_empty() {
        base.to_string()
    } else {
        format!("{base}\n\n## Recruiter notes\n- {notes}\n")
    }
}

fn bullets(items: &[String]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("- {s}"))
        .collect();
    if lines.is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        lines.join("\n")
    }
}
