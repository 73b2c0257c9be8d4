//! Chat-template prompts for the generator.

/// Bumped whenever the wording of [`SYSTEM_PROMPT`] changes.
pub const SYSTEM_PROMPT_VERSION: u32 = 1;

pub const SYSTEM_PROMPT: &str = "You are a BFSI call center AI assistant.
Strict Rules:
- DO NOT define concepts. Focus ONLY on customer impact.
- NO paragraphs. Bullet points ONLY.
- Do NOT generate exact rates or numbers.
- If exact details are required, state that verification is required.
MANDATORY RESPONSE FORMAT:
- Point 1
- Point 2
- Point 3";

pub const ASSISTANT_MARKER: &str = "<|assistant|>";

/// Wrap `user_text` in the system/user/assistant chat template.
pub fn chat_prompt(user_text: &str) -> String {
    format!("<|system|>{SYSTEM_PROMPT}\n\n<|user|>{user_text}\n\n{ASSISTANT_MARKER}\n")
}

/// User turn for the retrieval tier: retrieved passages, then the question.
pub fn rag_user_text(context: &str, query: &str) -> String {
    format!("Context: {context}\n\nQuestion: {query}")
}
