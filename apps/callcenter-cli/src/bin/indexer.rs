use std::fs;

use callcenter_cli::{init_tracing, spinner};
use callcenter_core::config::Config;
use callcenter_core::corpus::load_corpus;
use callcenter_core::documents::load_documents;
use callcenter_embed::get_default_embedder;
use callcenter_vector::LanceStore;

/// Rebuilds both LanceDB tables from the corpus JSON and the policy
/// documents. Any previous tables are removed first.
fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load()?;
    let settings = config.settings()?;
    let data = &settings.data;

    let corpus = load_corpus(&config.resolve(&data.corpus_path))?;
    let chunks = load_documents(&config.resolve(&data.rag_docs_dir), data.min_chunk_chars)?;
    let embedder = get_default_embedder(&config.resolve(&data.embed_model_dir))?;

    let pb = spinner("Embedding dataset questions");
    let questions: Vec<String> = corpus.iter().map(|r| r.instruction.clone()).collect();
    let question_vecs = embedder.embed_batch(&questions)?;
    pb.set_message("Embedding document sections");
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let chunk_vecs = embedder.embed_batch(&texts)?;
    pb.finish_and_clear();

    let lancedb_dir = config.resolve(&data.lancedb_dir);
    if lancedb_dir.exists() {
        fs::remove_dir_all(&lancedb_dir)?;
    }
    fs::create_dir_all(&lancedb_dir)?;
    let store = LanceStore::open(&lancedb_dir)?;
    store.write_dataset(&data.dataset_table, &question_vecs)?;
    store.write_chunks(&data.chunk_table, &chunks, &chunk_vecs)?;

    tracing::info!(
        records = corpus.len(),
        chunks = chunks.len(),
        dir = %lancedb_dir.display(),
        "indexes built"
    );
    Ok(())
}
