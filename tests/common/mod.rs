//! Scripted generative client shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use dc_agentic::LlmClient;
use design_code_chat::dialogue::TranscriptMessage;
use design_code_chat::ClassifyResponse;

/// Replays canned replies in order and records every prompt it receives
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn push(&self, reply: Value) {
        self.push_raw(reply.to_string());
    }

    pub fn push_raw(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts().last().cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    async fn next_reply(&self, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.next_reply(user_prompt).await
    }

    async fn chat_json(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.next_reply(user_prompt).await
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }
}

/// Reply asking for the division listings of `categories`
pub fn request_divisions(text: &str, categories: &[&str]) -> Value {
    json!({
        "status": "researching",
        "currentStep": "category",
        "reasoning": "Need divisions",
        "responseToUser": text,
        "nextStep": { "requestDivisionsFor": categories }
    })
}

/// Reply asking a question without requesting anything
pub fn ask(text: &str) -> Value {
    json!({
        "status": "researching",
        "currentStep": "division",
        "reasoning": "",
        "responseToUser": text,
        "nextStep": {}
    })
}

/// Transcript after a turn: prior context, the user text, the stored reply
pub fn extend(
    context: &[TranscriptMessage],
    user_text: &str,
    response: &ClassifyResponse,
) -> Vec<TranscriptMessage> {
    let mut next = context.to_vec();
    next.push(TranscriptMessage::user(user_text));
    next.push(TranscriptMessage::assistant(
        response.state_message.clone().expect("turn stores a state message"),
    ));
    next
}
