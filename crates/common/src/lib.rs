//! AstroMenu Common Library
//!
//! Shared code for the AstroMenu retrieval system including:
//! - Core data models (dishes, questions, results, chunk metadata)
//! - Dish catalog (knowledge-base lookup)
//! - Embedding client abstraction
//! - Completion client abstraction
//! - Error types and handling
//! - Configuration management

pub mod catalog;
pub mod completion;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod models;

// Re-export commonly used types
pub use catalog::DishCatalog;
pub use completion::CompletionClient;
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
