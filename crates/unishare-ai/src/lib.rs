pub mod appraisal;
pub mod client;
pub mod prompt;

pub use appraisal::{appraise_with_timeout, AiError, DamageReport, QualityGrade, VideoAppraisal};
pub use client::{AiClient, Assistant, GeminiClient};
