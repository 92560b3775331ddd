//! Vector index abstraction
//!
//! The index is an external, read-only service: it accepts a query
//! embedding, an optional metadata filter and a result count, and returns
//! ranked chunks. `QdrantIndex` is the production client; `MemoryIndex` is
//! an in-process implementation for tests.

mod memory;
mod qdrant;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

use crate::constraints::ConstraintSet;
use astromenu_common::errors::Result;
use astromenu_common::models::ScoredChunk;

/// Trait for nearest-neighbor search over indexed chunks
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return the `limit` chunks nearest to `embedding`, restricted to those
    /// matching `filter` when one is given. Results are ranked by descending
    /// similarity.
    async fn search(
        &self,
        embedding: &[f32],
        filter: Option<&ConstraintSet>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;
}
