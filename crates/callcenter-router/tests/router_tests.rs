use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use callcenter_core::settings::Settings;
use callcenter_core::traits::{Embedder, GenerativeModel, SimilarityIndex};
use callcenter_core::types::{DocumentChunk, GenerationParams, QaRecord, SearchHit, Tier};
use callcenter_core::Error;
use callcenter_router::{Artifacts, AssistantContext, ContextRetriever, DatasetMatcher, LookupTier, ResponseRouter};
use callcenter_vector::FlatIndex;

const REPO_RATE_QUERY: &str = "What happens if RBI increases repo rate?";
const PROVISIONING_QUERY: &str = "What is the RBI provisioning framework for NPA classification?";
const DATASET_QUERY: &str = "How do I block my debit card?";

/// Maps known texts to fixed vectors; anything else lands on `default`.
struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Embedder for TableEmbedder {
    fn dim(&self) -> usize { self.default.len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| self.table.get(t).cloned().unwrap_or_else(|| self.default.clone())).collect())
    }
}

/// Returns a canned completion and records every prompt it was given.
struct ScriptedModel {
    completion: Result<String, String>,
    prompts: Arc<Mutex<Vec<(String, GenerationParams)>>>,
}

impl GenerativeModel for ScriptedModel {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push((prompt.to_string(), *params));
        self.completion.clone().map_err(anyhow::Error::msg)
    }
}

struct Harness {
    router: ResponseRouter,
    prompts: Arc<Mutex<Vec<(String, GenerationParams)>>>,
    embed_calls: Arc<Mutex<Vec<String>>>,
}

fn corpus() -> Vec<QaRecord> {
    vec![
        QaRecord {
            instruction: DATASET_QUERY.to_string(),
            input: Some(String::new()),
            output: "- Call the 24x7 helpline to block the card.\n- You can also block it in the mobile app.".to_string(),
        },
        QaRecord {
            instruction: "How do I update my KYC?".to_string(),
            input: None,
            output: "- Visit the branch with valid ID proof.".to_string(),
        },
    ]
}

fn chunks() -> Vec<DocumentChunk> {
    ["NPA classification applies when interest or principal remains overdue for more than 90 days.",
     "Provisioning for substandard assets is made on the outstanding balance as per the prudential norms.",
     "Banks must report asset classification to the supervisory authority every quarter.",
     "Customer grievance redressal timelines are described in the customer service circular."]
        .iter()
        .map(|t| DocumentChunk { text: t.to_string(), source: "rbi_irac_norms.txt".to_string() })
        .collect()
}

/// Three-dimensional toy space: axis 0 is the dataset topic, axis 1 general
/// banking, axis 2 regulatory text.
fn harness_with(chunk_rows: Vec<Vec<f32>>, completion: Result<String, String>) -> Harness {
    let mut table = HashMap::new();
    table.insert(DATASET_QUERY.to_string(), vec![1.0, 0.0, 0.0]);
    table.insert(REPO_RATE_QUERY.to_string(), vec![0.0, 1.0, 0.0]);
    table.insert(PROVISIONING_QUERY.to_string(), vec![0.0, 0.0, 1.0]);
    let embed_calls = Arc::new(Mutex::new(Vec::new()));
    let prompts = Arc::new(Mutex::new(Vec::new()));

    let chunks = chunks().into_iter().take(chunk_rows.len()).collect();
    let artifacts = Artifacts {
        embedder: Box::new(TableEmbedder { table, default: vec![0.0, 1.0, 0.0], calls: embed_calls.clone() }),
        dataset_index: Box::new(FlatIndex::from_rows(3, vec![vec![1.0, 0.0, 0.0], vec![0.7, 0.7, 0.0]]).unwrap()),
        corpus: corpus(),
        chunk_index: Box::new(FlatIndex::from_rows(3, chunk_rows).unwrap()),
        chunks,
        generator: Box::new(ScriptedModel { completion, prompts: prompts.clone() }),
    };
    let ctx = AssistantContext::new(Settings::default(), artifacts).expect("context");
    Harness { router: ResponseRouter::new(ctx), prompts, embed_calls }
}

fn covering_chunks() -> Vec<Vec<f32>> {
    vec![vec![0.0, 0.0, 1.0], vec![0.0, 0.6, 0.8], vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]
}

fn unrelated_chunks() -> Vec<Vec<f32>> {
    vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]
}

const MODEL_ANSWER: &str = "<|system|>rules\n- Point 1\n<|assistant|>\n- Your EMI may rise.\n- Loan tenure may be extended.\n- Verify exact terms with the bank.";

#[test]
fn exact_dataset_match_returns_stored_output() {
    let h = harness_with(covering_chunks(), Ok(MODEL_ANSWER.to_string()));

    let decision = h.router.route(DATASET_QUERY).expect("route");
    assert_eq!(decision.tier, Tier::Dataset);
    assert_eq!(decision.provenance(), "Tier 1 (Dataset)");
    assert_eq!(decision.response, corpus()[0].output);
    assert!((decision.dataset_score - 1.0).abs() < 1e-6);
    assert!(h.prompts.lock().unwrap().is_empty(), "no generation on a dataset hit");
}

#[test]
fn below_threshold_lookup_is_a_fallback_without_response() {
    let h = harness_with(covering_chunks(), Ok(MODEL_ANSWER.to_string()));

    let lookup = h.router.context().dataset_matcher().lookup(REPO_RATE_QUERY).expect("lookup");
    assert_eq!(lookup.tier, LookupTier::Fallback);
    assert_eq!(lookup.response, None);
    // Closest row is [0.7, 0.7, 0] at cos ~0.707, just under 0.74.
    assert!(lookup.score < 0.74 && lookup.score > 0.7, "score {}", lookup.score);
    assert_eq!(lookup.row, Some(1));
}

#[test]
fn general_query_routes_to_fine_tuned_model() {
    let h = harness_with(covering_chunks(), Ok(MODEL_ANSWER.to_string()));

    let decision = h.router.route(REPO_RATE_QUERY).expect("route");
    assert_eq!(decision.tier, Tier::FineTuned);
    assert_eq!(decision.provenance(), "Tier 2 (TinyLlama)");
    assert_eq!(decision.response, "- Your EMI may rise.\n- Loan tenure may be extended.\n- Verify exact terms with the bank.");
    assert_eq!(decision.retrieval_score, None, "non-policy queries skip retrieval");

    let prompts = h.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let (prompt, params) = &prompts[0];
    assert!(prompt.contains(&format!("<|user|>{REPO_RATE_QUERY}\n\n<|assistant|>")));
    assert!(!prompt.contains("Context:"));
    assert_eq!(*params, GenerationParams { max_new_tokens: 120, repetition_penalty: 1.2 });
}

#[test]
fn policy_query_with_context_routes_to_rag() {
    let h = harness_with(covering_chunks(), Ok(MODEL_ANSWER.to_string()));

    let decision = h.router.route(PROVISIONING_QUERY).expect("route");
    assert_eq!(decision.tier, Tier::Rag);
    assert_eq!(decision.provenance(), "Tier 3 (RAG)");
    assert!((decision.retrieval_score.unwrap() - 1.0).abs() < 1e-6);

    let prompts = h.prompts.lock().unwrap();
    let (prompt, _) = &prompts[0];
    let c = chunks();
    let expected = format!(
        "<|user|>Context: {}\n\n{}\n\n{}\n\nQuestion: {PROVISIONING_QUERY}",
        c[0].text, c[1].text, c[2].text
    );
    assert!(prompt.contains(&expected), "prompt was {prompt}");
}

#[test]
fn policy_query_without_context_falls_through_to_tier_two() {
    let h = harness_with(unrelated_chunks(), Ok(MODEL_ANSWER.to_string()));

    let decision = h.router.route(PROVISIONING_QUERY).expect("route");
    assert_eq!(decision.tier, Tier::FineTuned);
    assert_eq!(decision.provenance(), "Tier 2 (TinyLlama)");
    assert_eq!(decision.retrieval_score, Some(0.0));

    let prompts = h.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1, "tier 2 runs once, no retries");
    assert!(!prompts[0].0.contains("Context:"));
}

#[test]
fn retriever_concatenates_top_k_in_score_order() {
    let h = harness_with(covering_chunks(), Ok(MODEL_ANSWER.to_string()));

    let retrieved = h.router.context().retriever().retrieve(PROVISIONING_QUERY).expect("retrieve");
    let c = chunks();
    assert_eq!(retrieved.context.as_deref(), Some(format!("{}\n\n{}\n\n{}", c[0].text, c[1].text, c[2].text).as_str()));
    assert!((retrieved.score - 1.0).abs() < 1e-6);
}

#[test]
fn retriever_reports_best_score_when_below_threshold() {
    let h = harness_with(vec![vec![2.0, 0.0, 1.0], vec![0.0, 1.0, 0.0]], Ok(MODEL_ANSWER.to_string()));

    let retrieved = h.router.context().retriever().retrieve(PROVISIONING_QUERY).expect("retrieve");
    assert_eq!(retrieved.context, None);
    assert!((retrieved.score - 1.0 / 5f32.sqrt()).abs() < 1e-5, "score {}", retrieved.score);
}

#[test]
fn degenerate_model_output_becomes_fallback_answer() {
    let h = harness_with(covering_chunks(), Ok("I think rates will go up. No change to your EMI.".to_string()));

    let decision = h.router.route(REPO_RATE_QUERY).expect("route");
    assert_eq!(decision.tier, Tier::FineTuned);
    assert_eq!(decision.response, Settings::default().formatter.fallback.join("\n"));
}

#[test]
fn generation_failure_surfaces_as_error() {
    let h = harness_with(covering_chunks(), Err("backend unavailable".to_string()));

    let err = h.router.route(REPO_RATE_QUERY).expect_err("generation failure");
    assert!(err.to_string().contains("backend unavailable"));
}

#[test]
fn blank_query_skips_embedding() {
    let h = harness_with(covering_chunks(), Ok(MODEL_ANSWER.to_string()));

    let decision = h.router.route("   ").expect("route");
    assert_eq!(decision.tier, Tier::FineTuned);
    assert_eq!(decision.dataset_score, 0.0);
    assert!(h.embed_calls.lock().unwrap().is_empty());
}

#[test]
fn misaligned_corpus_is_rejected_at_startup() {
    let artifacts = Artifacts {
        embedder: Box::new(TableEmbedder { table: HashMap::new(), default: vec![0.0, 1.0, 0.0], calls: Arc::default() }),
        dataset_index: Box::new(FlatIndex::from_rows(3, vec![vec![1.0, 0.0, 0.0]]).unwrap()),
        corpus: corpus(),
        chunk_index: Box::new(FlatIndex::from_rows(3, unrelated_chunks()).unwrap()),
        chunks: chunks().into_iter().take(2).collect(),
        generator: Box::new(ScriptedModel { completion: Ok(String::new()), prompts: Arc::default() }),
    };
    let err = AssistantContext::new(Settings::default(), artifacts).err().expect("must fail");
    assert!(matches!(err, Error::Misaligned(_)));
}

#[test]
fn empty_chunk_store_is_rejected_at_startup() {
    let artifacts = Artifacts {
        embedder: Box::new(TableEmbedder { table: HashMap::new(), default: vec![0.0, 1.0, 0.0], calls: Arc::default() }),
        dataset_index: Box::new(FlatIndex::from_rows(3, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]).unwrap()),
        corpus: corpus(),
        chunk_index: Box::new(FlatIndex::new(3)),
        chunks: Vec::new(),
        generator: Box::new(ScriptedModel { completion: Ok(String::new()), prompts: Arc::default() }),
    };
    let err = AssistantContext::new(Settings::default(), artifacts).err().expect("must fail");
    assert!(matches!(err, Error::EmptyArtifact(_)));
}

#[test]
fn index_dimension_must_match_embedder() {
    let artifacts = Artifacts {
        embedder: Box::new(TableEmbedder { table: HashMap::new(), default: vec![0.0, 1.0], calls: Arc::default() }),
        dataset_index: Box::new(FlatIndex::from_rows(3, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]).unwrap()),
        corpus: corpus(),
        chunk_index: Box::new(FlatIndex::from_rows(3, unrelated_chunks()).unwrap()),
        chunks: chunks().into_iter().take(2).collect(),
        generator: Box::new(ScriptedModel { completion: Ok(String::new()), prompts: Arc::default() }),
    };
    let err = AssistantContext::new(Settings::default(), artifacts).err().expect("must fail");
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
}

/// Returns rows `0..scores.len()` with the given scores, whatever the query.
struct FixedScoreIndex {
    scores: Vec<f32>,
}

impl SimilarityIndex for FixedScoreIndex {
    fn dim(&self) -> usize { 3 }
    fn len(&self) -> usize { self.scores.len() }
    fn search(&self, _query: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(self.scores.iter().enumerate().take(k).map(|(row, &score)| SearchHit { row, score }).collect())
    }
}

fn plain_embedder() -> TableEmbedder {
    TableEmbedder { table: HashMap::new(), default: vec![0.0, 1.0, 0.0], calls: Arc::default() }
}

#[test]
fn dataset_score_equal_to_threshold_is_a_hit() {
    let settings = Settings::default();
    let threshold = settings.routing.dataset_threshold;
    let embedder = plain_embedder();
    let index = FixedScoreIndex { scores: vec![threshold, threshold - 0.1] };
    let corpus = corpus();

    let lookup = DatasetMatcher::new(&embedder, &index, &corpus, threshold).lookup(REPO_RATE_QUERY).expect("lookup");
    assert_eq!(lookup.tier, LookupTier::Dataset);
    assert_eq!(lookup.response.as_deref(), Some(corpus[0].output.as_str()));
    assert_eq!(lookup.score, threshold);

    let just_under = FixedScoreIndex { scores: vec![threshold - 1e-4] };
    let miss = DatasetMatcher::new(&embedder, &just_under, &corpus, threshold).lookup(REPO_RATE_QUERY).expect("lookup");
    assert_eq!(miss.tier, LookupTier::Fallback);
}

#[test]
fn context_score_equal_to_threshold_is_sufficient() {
    let settings = Settings::default();
    let threshold = settings.routing.context_threshold;
    let top_k = settings.routing.context_top_k;
    let embedder = plain_embedder();
    let index = FixedScoreIndex { scores: vec![threshold, 0.3, 0.2, 0.1] };
    let chunks = chunks();

    let retrieved = ContextRetriever::new(&embedder, &index, &chunks, top_k, threshold)
        .retrieve(PROVISIONING_QUERY)
        .expect("retrieve");
    let expected = chunks[..top_k].iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n");
    assert_eq!(retrieved.context.as_deref(), Some(expected.as_str()));
    assert_eq!(retrieved.score, threshold);

    let just_under = FixedScoreIndex { scores: vec![threshold - 1e-4, 0.3, 0.2] };
    let none = ContextRetriever::new(&embedder, &just_under, &chunks, top_k, threshold)
        .retrieve(PROVISIONING_QUERY)
        .expect("retrieve");
    assert_eq!(none.context, None);
}
