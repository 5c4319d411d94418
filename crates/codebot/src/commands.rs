//! Operator slash commands for inspecting and switching execution backends.
//!
//! Transport-agnostic: the handler takes a parsed command plus the issuing
//! user and returns the reply text. The surrounding event loop posts the
//! reply through whatever platform it speaks.

use std::sync::Arc;

use tracing::info;

use crate::backend::registry::{BackendRegistry, RegistryError};
use crate::gateway::{AuthPolicy, UserId};

pub const PERMISSION_DENIED: &str = "you don't have permission to do that";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// `/show-apis`: list configured backends, active marked `(*)`.
    ShowApis,
    /// `/change-api name:<string>`: select the named backend.
    ChangeApi { name: String },
}

pub struct CommandHandler {
    auth: Arc<dyn AuthPolicy>,
    registry: Arc<BackendRegistry>,
}

impl CommandHandler {
    pub fn new(auth: Arc<dyn AuthPolicy>, registry: Arc<BackendRegistry>) -> Self {
        Self { auth, registry }
    }

    /// Execute a command on behalf of `user` and produce the reply text.
    pub fn handle(&self, command: &SlashCommand, user: &UserId) -> String {
        if !self.auth.is_elevated(user) {
            return PERMISSION_DENIED.to_string();
        }

        match command {
            SlashCommand::ShowApis => {
                let rows: Vec<String> = self
                    .registry
                    .list()
                    .into_iter()
                    .map(|b| {
                        let marker = if b.is_current { " (*)" } else { "" };
                        format!(" - {}{marker}", b.name)
                    })
                    .collect();
                format!("Apis:\n{}", rows.join("\n"))
            }
            SlashCommand::ChangeApi { name } => match self.registry.select(name) {
                Ok(()) => {
                    info!(user = %user.0, backend = %name, "api switched by operator");
                    format!("Changed api to {name}")
                }
                Err(RegistryError::UnknownBackend(_)) => format!("api {name} not available"),
                Err(e) => e.to_string(),
            },
        }
    }
}
