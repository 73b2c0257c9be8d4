//! Read-only state shared by every query: models, indices, stores and
//! settings, checked once when the assistant starts.

use callcenter_core::settings::Settings;
use callcenter_core::traits::{Embedder, GenerativeModel, SimilarityIndex};
use callcenter_core::types::{DocumentChunk, QaRecord};
use callcenter_core::{Error, Result};

use crate::dataset::DatasetMatcher;
use crate::retriever::ContextRetriever;

/// Everything loaded from disk, before consistency checks.
pub struct Artifacts {
    pub embedder: Box<dyn Embedder>,
    pub dataset_index: Box<dyn SimilarityIndex>,
    pub corpus: Vec<QaRecord>,
    pub chunk_index: Box<dyn SimilarityIndex>,
    pub chunks: Vec<DocumentChunk>,
    pub generator: Box<dyn GenerativeModel>,
}

pub struct AssistantContext {
    settings: Settings,
    embedder: Box<dyn Embedder>,
    dataset_index: Box<dyn SimilarityIndex>,
    corpus: Vec<QaRecord>,
    chunk_index: Box<dyn SimilarityIndex>,
    chunks: Vec<DocumentChunk>,
    generator: Box<dyn GenerativeModel>,
}

impl AssistantContext {
    /// Fails when a store is empty, when a store and its index disagree on
    /// row count, or when an index does not match the embedder dimension.
    pub fn new(settings: Settings, artifacts: Artifacts) -> Result<Self> {
        settings.validate()?;
        let Artifacts { embedder, dataset_index, corpus, chunk_index, chunks, generator } = artifacts;

        check_store("dataset", corpus.len(), dataset_index.as_ref())?;
        check_store("chunk", chunks.len(), chunk_index.as_ref())?;
        for index in [dataset_index.as_ref(), chunk_index.as_ref()] {
            if index.dim() != embedder.dim() {
                return Err(Error::DimensionMismatch { expected: embedder.dim(), actual: index.dim() });
            }
        }
        tracing::info!(records = corpus.len(), chunks = chunks.len(), dim = embedder.dim(), "assistant context ready");
        Ok(Self { settings, embedder, dataset_index, corpus, chunk_index, chunks, generator })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn generator(&self) -> &dyn GenerativeModel {
        self.generator.as_ref()
    }

    pub fn dataset_matcher(&self) -> DatasetMatcher<'_> {
        DatasetMatcher::new(
            self.embedder.as_ref(),
            self.dataset_index.as_ref(),
            &self.corpus,
            self.settings.routing.dataset_threshold,
        )
    }

    pub fn retriever(&self) -> ContextRetriever<'_> {
        ContextRetriever::new(
            self.embedder.as_ref(),
            self.chunk_index.as_ref(),
            &self.chunks,
            self.settings.routing.context_top_k,
            self.settings.routing.context_threshold,
        )
    }
}

fn check_store(name: &str, records: usize, index: &dyn SimilarityIndex) -> Result<()> {
    if records == 0 || index.is_empty() {
        return Err(Error::EmptyArtifact(format!("{name} store has {records} records and {} index rows", index.len())));
    }
    if records != index.len() {
        return Err(Error::Misaligned(format!("{name} store has {records} records but its index has {} rows", index.len())));
    }
    Ok(())
}
