// Service exports
pub mod cancel;
pub mod engine;
pub mod gemini;
pub mod generator;

pub use cancel::CancelToken;
pub use engine::{HealthEngine, Recommendation};
pub use gemini::{GeminiClient, GenerateError, GenerationOptions, TextGenerator};
pub use generator::{AiGenerator, Generated, RetryPolicy};
