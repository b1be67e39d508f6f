pub mod llm;
pub mod recommend;

pub use llm::{LlmClient, OllamaChatClient};
pub use recommend::LlmProductRecommender;
