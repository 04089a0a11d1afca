//! Remote AI coaching call.
//!
//! One chat-completion POST per finished meeting. Any failure here is
//! recovered by the rule-based analyzer, never surfaced to the caller of
//! the analytics generator.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::meeting::records::TranscriptBlock;

/// Prompt budget; the tail of the conversation is kept when over.
const MAX_PROMPT_CHARS: usize = 6000;

const COACH_TEMPERATURE: f32 = 0.4;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<PromptMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct PromptMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct RemoteCoach {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl RemoteCoach {
    pub fn new(api_key: String, endpoint: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
            model,
        }
    }

    pub async fn coach(&self, transcript: &[TranscriptBlock]) -> Result<String> {
        let prompt = build_prompt(transcript);
        let request = ChatCompletionRequest {
            model: &self.model,
            temperature: COACH_TEMPERATURE,
            messages: vec![
                PromptMessage {
                    role: "system",
                    content: "You are an expert sales coach.",
                },
                PromptMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        debug!("Requesting coaching insights from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach coaching endpoint")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read coaching response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Coaching request failed with status {}: {}",
                status,
                body
            ));
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).context("Failed to parse coaching response")?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(anyhow!("Coaching response contained no text"));
        }

        Ok(text)
    }
}

fn build_prompt(transcript: &[TranscriptBlock]) -> String {
    let mut conversation = String::new();
    for block in transcript {
        conversation.push_str(&format!(
            "{}: {}\n",
            block.person_name, block.transcript_text
        ));
    }
    let conversation = tail_chars(&conversation, MAX_PROMPT_CHARS);

    format!(
        "You are a world-class sales coach. Analyze the following sales call transcript and produce:\n\
         1. Participant talk ratios and key stats (questions asked, filler words observed).\n\
         2. 5-8 bullet-point highlights of what the rep did well.\n\
         3. 5-8 bullet-point actionable areas for improvement.\n\
         4. Overall sentiment and next-step recommendation.\n\
         Output must be plain text, markdown-style bullets, no JSON. Keep it concise and helpful.\n\n\
         TRANSCRIPT:\n\n{conversation}"
    )
}

/// Last `max` characters of `text`, split on a char boundary. The most
/// recent conversation matters more than the opening.
fn tail_chars(text: &str, max: usize) -> &str {
    let char_count = text.chars().count();
    if char_count <= max {
        return text;
    }
    let skip = char_count - max;
    match text.char_indices().nth(skip) {
        Some((index, _)) => &text[index..],
        None => text,
    }
}
