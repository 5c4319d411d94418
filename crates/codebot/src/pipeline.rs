//! The compile-on-message pipeline.
//!
//! Inbound chat events drive a fixed chain: parse the body, take the first
//! fenced block, preprocess the source, execute it on the currently
//! selected backend, render and chunk the output, cache it, and attach the
//! ▶️ reaction. A later ▶️ reaction replays the cached parts; 🗑️ deletes
//! bot messages outside protected channels.
//!
//! ## Threading
//!
//! Event entry points (`on_message_created`, `on_message_updated`,
//! `on_reaction_added`) spawn the work onto the runtime and return
//! immediately; the event-delivery path never blocks on I/O. A semaphore
//! bounds how many compiles run at once.
//!
//! ## Ordering
//!
//! An edited message races its own earlier compile. Each compile is tagged
//! with a per-message sequence number and a cache write is dropped when a
//! newer compile has already been issued for that message, so the cache
//! converges on the latest edit regardless of network reordering.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::backend::registry::BackendRegistry;
use crate::backend::{ExecutionRequest, ExecutionResult};
use crate::cache::CompilationCache;
use crate::commands::{CommandHandler, SlashCommand};
use crate::gateway::{
    AuthPolicy, ChannelId, ChatGateway, ChatMessage, MessageId, ReactionEvent, UserId,
};
use crate::message::{to_code_fence, MessageBody};
use crate::processor;
use crate::render::{self, CODE_FENCE_OVERHEAD, DEFAULT_CHAR_LIMIT};

/// Reaction that replays cached compile output.
pub const PLAY: &str = "▶️";
/// Reaction that asks the bot to delete its own message.
pub const BASKET: &str = "🗑️";

/// Attachment filename for oversize output parts.
const OUTPUT_FILE_NAME: &str = "compiler-output.txt";

/// Notice posted when a replay finds no cached result.
const RESULT_UNAVAILABLE: &str =
    "Compilation result unavailable, compiling it again. Try the reaction again in a few seconds.";

/// Tunables and identity the pipeline needs from the surrounding process.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Channel message length limit.
    pub char_limit: usize,
    /// Channels where 🗑️ must not delete bot messages.
    pub protected_channels: HashSet<ChannelId>,
    /// The bot's own user id; used to recognize its messages.
    pub bot_user: UserId,
    /// Upper bound on concurrently running compiles.
    pub max_concurrent_compiles: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            char_limit: DEFAULT_CHAR_LIMIT,
            protected_channels: HashSet::new(),
            bot_user: UserId::new(""),
            max_concurrent_compiles: 4,
        }
    }
}

pub struct CompilePipeline {
    gateway: Arc<dyn ChatGateway>,
    registry: Arc<BackendRegistry>,
    cache: Arc<CompilationCache>,
    commands: CommandHandler,
    config: PipelineConfig,
    compile_slots: Arc<tokio::sync::Semaphore>,
    /// Guards cache writes against out-of-order completion; see module
    /// docs. Bounded to the cache capacity.
    sequences: SequenceGuard,
}

impl CompilePipeline {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        auth: Arc<dyn AuthPolicy>,
        registry: Arc<BackendRegistry>,
        cache: Arc<CompilationCache>,
        config: PipelineConfig,
    ) -> Arc<Self> {
        let commands = CommandHandler::new(auth, registry.clone());
        let sequences = SequenceGuard::new(cache.capacity());
        Arc::new(Self {
            gateway,
            registry,
            cache,
            commands,
            compile_slots: Arc::new(tokio::sync::Semaphore::new(
                config.max_concurrent_compiles.max(1),
            )),
            config,
            sequences,
        })
    }

    // --- Event entry points ---

    /// Inbound message-created event. Returns immediately.
    pub fn on_message_created(self: &Arc<Self>, msg: ChatMessage) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.compile_message(msg).await });
    }

    /// Inbound message-updated event. Same flow as creation: the new body
    /// is compiled and the cache entry replaced.
    pub fn on_message_updated(self: &Arc<Self>, msg: ChatMessage) {
        self.on_message_created(msg);
    }

    /// Inbound reaction-added event. Returns immediately.
    pub fn on_reaction_added(self: &Arc<Self>, evt: ReactionEvent) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.handle_reaction(evt).await });
    }

    /// Inbound slash command; replies in the issuing channel.
    pub fn on_slash_command(
        self: &Arc<Self>,
        command: SlashCommand,
        channel: ChannelId,
        user: UserId,
    ) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let reply = pipeline.commands.handle(&command, &user);
            if let Err(e) = pipeline.gateway.post(&channel, &reply).await {
                warn!(error = %e, "failed to post command reply");
            }
        });
    }

    // --- Compile path ---

    /// Run the full compile chain for one message. The event entry points
    /// spawn this; embedding transports and tests may await it directly.
    pub async fn compile_message(&self, msg: ChatMessage) {
        if msg.author_is_bot {
            return;
        }
        let Some(block) = MessageBody::parse(&msg.body).first_code_block() else {
            return;
        };

        let seq = self.sequences.next(&msg.id);

        let result = match processor::process(&block.text, &block.lang) {
            Ok(source) => {
                let Ok(_slot) = self.compile_slots.acquire().await else {
                    return;
                };
                let backend = self.registry.current();
                let req = ExecutionRequest::new(source, block.lang.clone());
                debug!(message = %msg.id.0, backend = %backend.name(), lang = %block.lang, "compiling");
                match backend.execute(&req).await {
                    Ok(result) => result,
                    Err(e) => {
                        // Infrastructure fault: nothing cached, no reaction,
                        // the user sees nothing. ▶️ on the message will
                        // re-attempt.
                        warn!(message = %msg.id.0, backend = %backend.name(), error = %e,
                              "execution transport failure");
                        return;
                    }
                }
            }
            Err(e) => ExecutionResult::preprocessing_failure(e.to_string()),
        };

        self.cache_and_react(&msg, result, seq).await;
    }

    async fn cache_and_react(&self, msg: &ChatMessage, result: ExecutionResult, seq: u64) {
        let parts = render::render_parts(&result, self.inline_budget());

        let stored = self
            .sequences
            .commit(&msg.id, seq, || self.cache.put(msg.id.clone(), parts));
        if !stored {
            debug!(message = %msg.id.0, seq, "discarding stale compile result");
            return;
        }

        info!(message = %msg.id.0, exit_code = result.exit_code, "compile result cached");
        if let Err(e) = self
            .gateway
            .add_reaction(&msg.channel, &msg.id, PLAY)
            .await
        {
            warn!(message = %msg.id.0, error = %e, "failed to attach play reaction");
        }
    }

    // --- Reaction path ---

    /// Handle one reaction event. See `on_reaction_added`.
    pub async fn handle_reaction(&self, evt: ReactionEvent) {
        if evt.user_is_bot {
            return;
        }
        match evt.emoji.as_str() {
            PLAY => self.replay(&evt).await,
            BASKET => self.delete_if_allowed(&evt).await,
            _ => {}
        }
    }

    async fn replay(&self, evt: &ReactionEvent) {
        if let Some(parts) = self.cache.get(&evt.message_id) {
            self.deliver_parts(&evt.channel, &parts).await;
            return;
        }

        // Cache miss (evicted, or the compile never finished): re-enter the
        // compile flow for the original message and tell the user to retry.
        debug!(message = %evt.message_id.0, "replay miss, recompiling");
        match self
            .gateway
            .fetch_message(&evt.channel, &evt.message_id)
            .await
        {
            Ok(msg) => {
                if let Err(e) = self.gateway.post(&evt.channel, RESULT_UNAVAILABLE).await {
                    warn!(error = %e, "failed to post retry notice");
                }
                self.compile_message(msg).await;
            }
            Err(e) => warn!(message = %evt.message_id.0, error = %e, "failed to fetch message"),
        }
    }

    async fn deliver_parts(&self, channel: &ChannelId, parts: &[String]) {
        for part in parts {
            let delivery = if part.len() > self.inline_budget() {
                self.gateway
                    .post_file(channel, OUTPUT_FILE_NAME, part.as_bytes())
                    .await
            } else {
                self.gateway.post(channel, &to_code_fence(part)).await
            };
            if let Err(e) = delivery {
                warn!(error = %e, "failed to deliver output part");
            }
        }
    }

    async fn delete_if_allowed(&self, evt: &ReactionEvent) {
        if self.config.protected_channels.contains(&evt.channel) {
            return;
        }
        let msg = match self
            .gateway
            .fetch_message(&evt.channel, &evt.message_id)
            .await
        {
            Ok(msg) => msg,
            Err(e) => {
                warn!(message = %evt.message_id.0, error = %e, "failed to fetch message");
                return;
            }
        };
        if msg.author != self.config.bot_user {
            return;
        }
        if let Err(e) = self
            .gateway
            .delete_message(&evt.channel, &evt.message_id)
            .await
        {
            warn!(message = %evt.message_id.0, error = %e, "unable to remove message");
        }
    }

    /// How much of the channel limit is left for part text once the inline
    /// code fence is added.
    fn inline_budget(&self) -> usize {
        self.config.char_limit.saturating_sub(CODE_FENCE_OVERHEAD)
    }
}

// --- Sequence guard ---

/// Latest issued/stored compile sequence per message.
///
/// Bounded the same way the result cache is: IndexMap insertion order is
/// the recency queue and the oldest entry is evicted once the cap is
/// exceeded, so the guard never holds more per-message state than the
/// cache it protects.
struct SequenceGuard {
    entries: Mutex<IndexMap<MessageId, SeqState>>,
    capacity: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct SeqState {
    issued: u64,
    stored: u64,
}

impl SequenceGuard {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Issue the next compile sequence number for a message.
    fn next(&self, id: &MessageId) -> u64 {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = entries.shift_remove(id).unwrap_or_default();
        state.issued += 1;
        entries.insert(id.clone(), state);
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
        state.issued
    }

    /// Run `write` only when no newer compile has been issued or stored
    /// for this message. The write happens under the guard lock so a stale
    /// writer can never land after a newer one.
    fn commit(&self, id: &MessageId, seq: u64, write: impl FnOnce()) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = entries.shift_remove(id).unwrap_or_default();
        let stale = seq < state.stored || seq < state.issued;
        if !stale {
            state.stored = seq;
        }
        entries.insert(id.clone(), state);
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
        if stale {
            return false;
        }
        write();
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
