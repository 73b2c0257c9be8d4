use anyhow::Result;

use callcenter_core::types::{RoutingDecision, Tier};

use crate::classifier::PolicyQueryClassifier;
use crate::context::AssistantContext;
use crate::dataset::LookupTier;
use crate::formatter::ResponseFormatter;
use crate::prompt::{chat_prompt, rag_user_text, SYSTEM_PROMPT_VERSION};

/// Runs tier 1, then tier 3 for policy questions, then tier 2. Each tier is
/// tried at most once per query.
pub struct ResponseRouter {
    ctx: AssistantContext,
    classifier: PolicyQueryClassifier,
    formatter: ResponseFormatter,
}

impl ResponseRouter {
    pub fn new(ctx: AssistantContext) -> Self {
        let classifier = PolicyQueryClassifier::new(&ctx.settings().classifier);
        let formatter = ResponseFormatter::new(ctx.settings().formatter.clone());
        tracing::debug!(system_prompt_version = SYSTEM_PROMPT_VERSION, "router ready");
        Self { ctx, classifier, formatter }
    }

    pub fn context(&self) -> &AssistantContext {
        &self.ctx
    }

    pub fn route(&self, query: &str) -> Result<RoutingDecision> {
        let tier1 = self.ctx.dataset_matcher().lookup(query)?;
        tracing::info!(score = %format!("{:.4}", tier1.score), row = ?tier1.row, "tier 1 score");

        if let (LookupTier::Dataset, Some(response)) = (tier1.tier, tier1.response) {
            return Ok(self.decide(Tier::Dataset, response, tier1.score, None));
        }

        let mut retrieval_score = None;
        if self.classifier.is_policy_query(query) {
            let retrieved = self.ctx.retriever().retrieve(query)?;
            tracing::info!(score = %format!("{:.4}", retrieved.score), "RAG retrieval score");
            retrieval_score = Some(retrieved.score);
            if let Some(context) = retrieved.context {
                let response = self.generate(&rag_user_text(&context, query))?;
                return Ok(self.decide(Tier::Rag, response, tier1.score, retrieval_score));
            }
            tracing::debug!("no sufficient context, falling through to the fine-tuned model");
        }

        let response = self.generate(query)?;
        Ok(self.decide(Tier::FineTuned, response, tier1.score, retrieval_score))
    }

    fn generate(&self, user_text: &str) -> Result<String> {
        let raw = self.ctx.generator().generate(&chat_prompt(user_text), &self.ctx.settings().generation)?;
        Ok(self.formatter.format(&raw))
    }

    fn decide(&self, tier: Tier, response: String, dataset_score: f32, retrieval_score: Option<f32>) -> RoutingDecision {
        tracing::info!(source = %tier, "answer selected");
        RoutingDecision { tier, response, dataset_score, retrieval_score }
    }
}
