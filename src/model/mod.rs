//! Model inference collaborator: prompt in, generated text out.

pub mod ollama;
pub mod types;

pub use ollama::{http_client, OllamaClient};
pub use types::ModelError;
