use std::env;
use std::io::{self, BufRead, Write};

use callcenter_cli::{init_tracing, spinner};
use callcenter_core::config::Config;
use callcenter_core::corpus::load_corpus;
use callcenter_embed::get_default_embedder;
use callcenter_llm::TinyLlamaGenerator;
use callcenter_router::{Artifacts, AssistantContext, ResponseRouter};
use callcenter_vector::LanceStore;

const RULE: &str = "========================================";

fn read_query() -> anyhow::Result<String> {
    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    print!("Customer Query: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn build_router(config: &Config) -> anyhow::Result<ResponseRouter> {
    let settings = config.settings()?;
    let data = &settings.data;
    let pb = spinner("Loading models and indexes");

    let embedder = get_default_embedder(&config.resolve(&data.embed_model_dir))?;
    let store = LanceStore::open(&config.resolve(&data.lancedb_dir))?;
    let dataset_index = store.load_dataset_index(&data.dataset_table)?;
    let chunk_store = store.load_chunk_store(&data.chunk_table)?;
    let corpus = load_corpus(&config.resolve(&data.corpus_path))?;
    let generator = TinyLlamaGenerator::new(&config.resolve(&data.llm_model_dir))?;

    let artifacts = Artifacts {
        embedder,
        dataset_index: Box::new(dataset_index),
        corpus,
        chunk_index: Box::new(chunk_store.index),
        chunks: chunk_store.chunks,
        generator: Box::new(generator),
    };
    let ctx = AssistantContext::new(settings, artifacts)?;
    pb.finish_and_clear();
    Ok(ResponseRouter::new(ctx))
}

fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    let router = build_router(&config)?;
    let query = read_query()?;

    let decision = router.route(&query)?;
    println!("\n{RULE}");
    println!("FINAL SOURCE: {}", decision.provenance());
    println!("RESPONSE:\n{}", decision.response);
    println!("{RULE}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    run().inspect_err(|e| tracing::error!(error = %format!("{e:#}"), "query failed"))
}
