//! External seams: the chat transport and the authorization policy.
//!
//! The pipeline never talks to a concrete chat platform. Everything it needs
//! from the transport goes through [`ChatGateway`]; everything it needs to
//! know about operator privileges goes through [`AuthPolicy`]. Real
//! deployments implement these against their platform SDK; tests implement
//! them as recording fakes.

use async_trait::async_trait;
use thiserror::Error;

/// Opaque channel identifier as issued by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

/// Opaque message identifier as issued by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// Opaque user identifier as issued by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// A chat message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel: ChannelId,
    pub author: UserId,
    /// Whether the platform marks the author as a bot account.
    pub author_is_bot: bool,
    /// Raw message body, fences and all.
    pub body: String,
}

/// A reaction-added event as delivered by the transport.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub channel: ChannelId,
    pub user: UserId,
    pub user_is_bot: bool,
    /// The emoji as a unicode string (e.g. `"▶️"`).
    pub emoji: String,
}

/// Errors surfaced by the chat transport.
///
/// Callers in the pipeline log these and move on; a flaky transport must
/// never take the compile path down with it.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("message {0:?} not found")]
    MessageNotFound(MessageId),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("operation not permitted by the platform: {0}")]
    Forbidden(String),
}

/// Outbound operations the pipeline needs from the chat platform.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Post a plain text message to a channel.
    async fn post(&self, channel: &ChannelId, text: &str) -> Result<(), GatewayError>;

    /// Upload a text file attachment to a channel.
    async fn post_file(
        &self,
        channel: &ChannelId,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), GatewayError>;

    /// Attach an emoji reaction to an existing message.
    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), GatewayError>;

    /// Delete a message.
    async fn delete_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), GatewayError>;

    /// Retrieve a message by id (used when a reaction arrives for a message
    /// whose body we no longer have in hand).
    async fn fetch_message(
        &self,
        channel: &ChannelId,
        id: &MessageId,
    ) -> Result<ChatMessage, GatewayError>;
}

/// Privilege check consulted by operator-only commands.
#[cfg_attr(test, mockall::automock)]
pub trait AuthPolicy: Send + Sync {
    fn is_elevated(&self, user: &UserId) -> bool;
}
