pub mod generator;
pub mod models;
pub mod prompt;
pub mod providers;

pub use generator::{FixRecommendation, RecommendationGenerator, RecommendationInput};
pub use providers::openai::OpenAiProvider;
