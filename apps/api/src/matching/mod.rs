//! CV-vs-job matching: prompt construction, LLM evaluation, lenient decoding,
//! report rendering and the sequential batch runner.

pub mod batch;
pub mod decoder;
pub mod evaluator;
pub mod prompts;
pub mod report;
