// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// System prompt that enforces terse, JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "Be rigorous, factual, and concise. Output JSON only.";

/// Grounding rules appended to every evaluation prompt.
pub const GROUNDING_RULES: &str = "\
Rules:
- Do NOT invent. Only claim what is explicitly in the CV.
- Keep bullets short and business-ready.";
