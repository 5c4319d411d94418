//! Shared fakes for exercising the pipeline without a chat platform or a
//! real execution service.

// not every test binary uses every helper
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codebot::backend::{ExecutionBackend, ExecutionRequest, ExecutionResult, TransportError};
use codebot::gateway::{
    AuthPolicy, ChannelId, ChatGateway, ChatMessage, GatewayError, MessageId, UserId,
};

// ---------------------------------------------------------------------------
// Chat gateway fake
// ---------------------------------------------------------------------------

/// Everything the pipeline asked the gateway to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Post { channel: String, text: String },
    PostFile { channel: String, name: String, len: usize },
    AddReaction { message: String, emoji: String },
    DeleteMessage { message: String },
}

#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<GatewayCall>>,
    /// Messages `fetch_message` can return, keyed by id.
    pub messages: Mutex<HashMap<String, ChatMessage>>,
}

impl FakeGateway {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stash_message(&self, msg: &ChatMessage) {
        self.messages
            .lock()
            .unwrap()
            .insert(msg.id.0.clone(), msg.clone());
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reactions_on(&self, message_id: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::AddReaction { message, emoji } if message == message_id => {
                    Some(emoji)
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn post(&self, channel: &ChannelId, text: &str) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::Post {
            channel: channel.0.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn post_file(
        &self,
        channel: &ChannelId,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::PostFile {
            channel: channel.0.clone(),
            name: name.to_string(),
            len: bytes.len(),
        });
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::AddReaction {
            message: message.0.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::DeleteMessage {
            message: message.0.clone(),
        });
        Ok(())
    }

    async fn fetch_message(
        &self,
        _channel: &ChannelId,
        id: &MessageId,
    ) -> Result<ChatMessage, GatewayError> {
        self.messages
            .lock()
            .unwrap()
            .get(&id.0)
            .cloned()
            .ok_or_else(|| GatewayError::MessageNotFound(id.clone()))
    }
}

// ---------------------------------------------------------------------------
// Execution backend fake
// ---------------------------------------------------------------------------

/// Backend scripted by source text: each known source maps to a result.
/// Unknown languages produce the standard logical failure; unknown sources
/// produce an empty success.
pub struct ScriptedBackend {
    pub name: String,
    pub responses: Mutex<HashMap<String, ExecutionResult>>,
    pub requests: Mutex<Vec<ExecutionRequest>>,
    pub refreshes: AtomicUsize,
    pub languages: Vec<String>,
    pub fail_transport: AtomicBool,
    /// Sources whose execution blocks until a permit arrives, for tests
    /// that need two compiles of the same message in flight at once.
    pub gates: Mutex<HashMap<String, Arc<tokio::sync::Semaphore>>>,
}

impl ScriptedBackend {
    pub fn arc(name: &str, languages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
            languages: languages.iter().map(|s| s.to_string()).collect(),
            fail_transport: AtomicBool::new(false),
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn respond(&self, source: &str, result: ExecutionResult) {
        self.responses
            .lock()
            .unwrap()
            .insert(source.to_string(), result);
    }

    pub fn respond_stdout(&self, source: &str, stdout: &str) {
        self.respond(
            source,
            ExecutionResult {
                stdout: Some(stdout.to_string()),
                ..Default::default()
            },
        );
    }

    /// Make executions of `source` wait; returns the release handle.
    pub fn gate(&self, source: &str) -> Arc<tokio::sync::Semaphore> {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(source.to_string(), gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionResult, TransportError> {
        self.requests.lock().unwrap().push(req.clone());

        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout {
                url: "http://scripted.test".to_string(),
            });
        }
        if !self.languages.contains(&req.lang) {
            return Ok(ExecutionResult::unsupported_language(&req.lang));
        }

        let gate = self.gates.lock().unwrap().get(&req.source).cloned();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&req.source)
            .cloned()
            .unwrap_or_default())
    }

    async fn refresh_catalog(&self) -> Result<(), TransportError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn supports(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }
}

// ---------------------------------------------------------------------------
// Auth fake
// ---------------------------------------------------------------------------

/// Grants elevation to a fixed set of users.
pub struct StaticAuth {
    pub elevated: Vec<UserId>,
}

impl StaticAuth {
    pub fn arc(elevated: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            elevated: elevated.iter().map(|u| UserId::new(*u)).collect(),
        })
    }
}

impl AuthPolicy for StaticAuth {
    fn is_elevated(&self, user: &UserId) -> bool {
        self.elevated.contains(user)
    }
}

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

pub fn user_message(id: &str, channel: &str, body: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId::new(id),
        channel: ChannelId::new(channel),
        author: UserId::new("user-7"),
        author_is_bot: false,
        body: body.to_string(),
    }
}

pub fn bot_message(id: &str, channel: &str, body: &str, bot_user: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId::new(id),
        channel: ChannelId::new(channel),
        author: UserId::new(bot_user),
        author_is_bot: true,
        body: body.to_string(),
    }
}
