//! AstroMenu Retrieval Pipeline
//!
//! Answers natural-language questions about galactic restaurant dishes by
//! combining three stages over a vector index of dish chunks:
//! - Constraint extraction: a completion service turns the question into
//!   categorical include/exclude filters plus a rewritten semantic query
//! - Candidate search: metadata-filtered nearest-neighbor search with a
//!   pure-semantic fallback when the filtered attempt finds nothing
//! - Verification: a second completion pass confirms which candidates
//!   actually satisfy the question
//!
//! Questions are processed independently; the pipeline coordinator runs
//! batches concurrently and writes one result record per question.

pub mod constraints;
pub mod extractor;
pub mod index;
pub mod pipeline;
pub mod prompts;
pub mod search;
pub mod verifier;

// Re-export the pipeline surface
pub use constraints::{ConstraintSet, Dimension, DimensionFilter};
pub use extractor::{ConstraintExtractor, Extraction};
pub use index::{MemoryIndex, QdrantIndex, VectorIndex};
pub use pipeline::{run_batch, BatchOptions, BatchSummary, QuestionState, RetrievalPipeline};
pub use search::{Candidate, CandidateSearch, SearchOutcome};
pub use verifier::CandidateVerifier;
