//! In-crate chat model doubles for unit tests.

use super::config::AgentRole;
use async_trait::async_trait;
use llm::{ChatModel, ChatRequest, ChatResponse, LlmError, Result, UsageMetadata};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Always answers with the same text and records every request.
pub(crate) struct StaticModel {
    reply: String,
    usage: Option<UsageMetadata>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StaticModel {
    pub(crate) fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            usage: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage = Some(usage);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ChatModel for StaticModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = request.model.clone().unwrap_or_else(|| "static".to_string());
        self.requests.lock().push(request);

        let mut response = ChatResponse::new(model, self.reply.clone());
        response.usage = self.usage;
        Ok(response)
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

/// Fails every call with a freshly built error.
pub(crate) struct FailingModel {
    make_error: Box<dyn Fn() -> LlmError + Send + Sync>,
    calls: AtomicUsize,
}

impl FailingModel {
    pub(crate) fn new(make_error: impl Fn() -> LlmError + Send + Sync + 'static) -> Self {
        Self {
            make_error: Box::new(make_error),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for FailingModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.make_error)())
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Answers per agent role, recognised by the default system prompt.
///
/// Roles without a scripted reply fail with a provider error.
pub(crate) struct RoleScriptedModel {
    replies: HashMap<AgentRole, String>,
    calls: Mutex<HashMap<AgentRole, usize>>,
}

impl RoleScriptedModel {
    pub(crate) fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn reply(mut self, role: AgentRole, text: impl Into<String>) -> Self {
        self.replies.insert(role, text.into());
        self
    }

    pub(crate) fn calls(&self, role: AgentRole) -> usize {
        self.calls.lock().get(&role).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    fn role_of(request: &ChatRequest) -> Option<AgentRole> {
        let system = request.messages.first()?.content.as_str();
        AgentRole::ALL
            .into_iter()
            .find(|role| role.default_system_prompt() == system)
    }
}

#[async_trait]
impl ChatModel for RoleScriptedModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let role = Self::role_of(&request)
            .ok_or_else(|| LlmError::InvalidRequest("unrecognised system prompt".to_string()))?;
        *self.calls.lock().entry(role).or_insert(0) += 1;

        let reply = self
            .replies
            .get(&role)
            .ok_or_else(|| LlmError::ProviderError(format!("no scripted reply for {}", role)))?;

        Ok(ChatResponse::new("scripted", reply.clone()).with_usage(UsageMetadata::new(20, 10)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
