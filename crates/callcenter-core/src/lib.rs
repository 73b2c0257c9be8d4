//! Shared vocabulary of the call-center assistant: records, chunks and
//! routing decisions, the embedder/index/generator traits, typed settings
//! loaded through figment, and the loaders for the answer corpus and the
//! policy documents.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod corpus;
pub mod documents;
pub mod error;
pub mod settings;
pub mod similarity;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
