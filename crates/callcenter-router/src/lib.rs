//! Tiered answering for the BFSI call-center assistant.
//!
//! A query is answered from the curated dataset when a close enough match
//! exists, from retrieval-augmented generation when it reads as a
//! regulatory/policy question and the document corpus covers it, and from
//! the fine-tuned model otherwise. Generated text always passes through
//! [`ResponseFormatter`] before it reaches the caller.

pub mod classifier;
pub mod context;
pub mod dataset;
pub mod formatter;
pub mod prompt;
pub mod retriever;
pub mod router;

pub use classifier::PolicyQueryClassifier;
pub use context::{Artifacts, AssistantContext};
pub use dataset::{DatasetLookup, DatasetMatcher, LookupTier};
pub use formatter::ResponseFormatter;
pub use retriever::{ContextRetriever, RetrievedContext};
pub use router::ResponseRouter;
