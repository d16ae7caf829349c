//! Wire model for inbound interaction envelopes.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INTERACTION_TYPE_PING: i64 = 1;
pub const INTERACTION_TYPE_APPLICATION_COMMAND: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `InteractionKind` values.
pub enum InteractionKind {
    Heartbeat,
    Command,
    Other(i64),
}

impl From<i64> for InteractionKind {
    fn from(value: i64) -> Self {
        match value {
            INTERACTION_TYPE_PING => Self::Heartbeat,
            INTERACTION_TYPE_APPLICATION_COMMAND => Self::Command,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One named argument supplied with a command invocation.
pub struct CommandOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
/// Name and options of an invoked command.
pub struct CommandInvocation {
    pub name: String,
    pub options: Vec<CommandOption>,
}

impl CommandInvocation {
    /// Returns the value of the first option called `name` that carries a value.
    pub fn option_value(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .filter(|option| option.name == name)
            .find_map(|option| option.value.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A parsed, request-scoped interaction.
pub struct Interaction {
    pub kind: InteractionKind,
    pub id: String,
    pub token: String,
    /// Present only for command envelopes that name a command.
    pub command: Option<CommandInvocation>,
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: i64,
    #[serde(default)]
    id: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    data: Option<RawCommandData>,
}

#[derive(Debug, Deserialize)]
struct RawCommandData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    options: Option<Vec<CommandOption>>,
}

/// Parses a verified request body into an [`Interaction`].
///
/// Command envelopes must carry an id and a callback token. A command envelope
/// without a command name parses with `command: None` and is left for the
/// caller to treat as unknown. Other kinds only need an integer `type`.
pub fn parse_interaction(body: &[u8]) -> Result<Interaction> {
    let raw: RawInteraction =
        serde_json::from_slice(body).context("interaction body is not a valid envelope")?;
    let kind = InteractionKind::from(raw.kind);

    let command = match kind {
        InteractionKind::Command => {
            if raw.id.trim().is_empty() {
                bail!("command interaction is missing 'id'");
            }
            if raw.token.trim().is_empty() {
                bail!("command interaction is missing 'token'");
            }
            raw.data
                .filter(|data| !data.name.trim().is_empty())
                .map(|data| CommandInvocation {
                    name: data.name,
                    options: data.options.unwrap_or_default(),
                })
        }
        InteractionKind::Heartbeat | InteractionKind::Other(_) => None,
    };

    Ok(Interaction {
        kind,
        id: raw.id,
        token: raw.token,
        command,
    })
}
