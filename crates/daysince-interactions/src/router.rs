//! Request-scoped state machine that authenticates, parses and dispatches interactions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use daysince_access::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use daysince_core::{elapsed_whole_days, start_of_utc_day};
use daysince_store::{
    IncidentRecord, IncidentStore, IncidentStoreError, StoreResult, UNKNOWN_INCIDENT_DESCRIPTION,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::interaction::{parse_interaction, CommandInvocation, Interaction, InteractionKind};
use crate::responder::{InteractionCallback, InteractionResponder, RESPONSE_TYPE_PONG};

pub const DAYS_COMMAND: &str = "days";
pub const RESET_COMMAND: &str = "reset";
pub const REASON_OPTION: &str = "reason";

pub const MISSING_BODY_MESSAGE: &str = "Invalid parameters: Request does not have a body.";
pub const INVALID_BODY_MESSAGE: &str =
    "Invalid parameters: Request body is not a valid interaction.";
pub const INVALID_SIGNATURE_MESSAGE: &str = "Invalid request signature.";
pub const UNKNOWN_INTERACTION_MESSAGE: &str = "Don't know what to do";
pub const RESET_FAILED_MESSAGE: &str = "Failed to record incident.";
pub const COMMAND_ACKNOWLEDGEMENT: &str = "Ok.";

pub const DAYS_FALLBACK_REPLY: &str =
    "Sorry, the bot is broken, so I guess that means it has been 0 days since the last incident.";
pub const RESET_CONFIRMATION_REPLY: &str = "Okay. It's now 0 days since the last incident.";
pub const RESET_FAILURE_REPLY: &str = "Sorry, I couldn't record that incident. Please try again.";

pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Transport-agnostic view of one inbound webhook request.
pub struct InboundRequest {
    pub body: Bytes,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
}

impl InboundRequest {
    pub fn from_parts(headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            body,
            signature: header_value(headers, SIGNATURE_HEADER),
            timestamp: header_value(headers, TIMESTAMP_HEADER),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal state reached by [`InteractionRouter::route`].
pub enum RouteOutcome {
    Rejected {
        status: StatusCode,
        message: &'static str,
    },
    Pong,
    Acknowledged,
}

impl RouteOutcome {
    fn rejected(status: StatusCode, message: &'static str) -> Self {
        Self::Rejected { status, message }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rejected { status, .. } => *status,
            Self::Pong | Self::Acknowledged => StatusCode::OK,
        }
    }
}

impl IntoResponse for RouteOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Rejected { status, message } => {
                (status, Json(json!({ "message": message }))).into_response()
            }
            Self::Pong => (StatusCode::OK, Json(json!({ "type": RESPONSE_TYPE_PONG })))
                .into_response(),
            Self::Acknowledged => (StatusCode::OK, COMMAND_ACKNOWLEDGEMENT).into_response(),
        }
    }
}

/// Routes verified interactions to the `days` and `reset` handlers.
pub struct InteractionRouter {
    verifier: SignatureVerifier,
    store: Arc<dyn IncidentStore>,
    responder: Arc<dyn InteractionResponder>,
    store_timeout: Duration,
}

impl InteractionRouter {
    pub fn new(
        verifier: SignatureVerifier,
        store: Arc<dyn IncidentStore>,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        Self {
            verifier,
            store,
            responder,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Runs one request through body check, signature check, parsing and dispatch.
    /// `now_unix` decides which calendar day the command runs on.
    pub async fn route(&self, request: &InboundRequest, now_unix: i64) -> RouteOutcome {
        if request.body.is_empty() {
            return RouteOutcome::rejected(StatusCode::BAD_REQUEST, MISSING_BODY_MESSAGE);
        }

        let (Some(signature), Some(timestamp)) = (&request.signature, &request.timestamp) else {
            warn!("interaction request is missing signature headers");
            return RouteOutcome::rejected(StatusCode::UNAUTHORIZED, INVALID_SIGNATURE_MESSAGE);
        };
        if !self.verifier.verify(timestamp, &request.body, signature) {
            warn!("interaction request signature verification failed");
            return RouteOutcome::rejected(StatusCode::UNAUTHORIZED, INVALID_SIGNATURE_MESSAGE);
        }

        let interaction = match parse_interaction(&request.body) {
            Ok(interaction) => interaction,
            Err(error) => {
                warn!(%error, "verified interaction body could not be parsed");
                return RouteOutcome::rejected(StatusCode::BAD_REQUEST, INVALID_BODY_MESSAGE);
            }
        };

        match (&interaction.kind, &interaction.command) {
            (InteractionKind::Heartbeat, _) => {
                info!("responding to a ping");
                RouteOutcome::Pong
            }
            (InteractionKind::Command, Some(command)) if command.name == DAYS_COMMAND => {
                info!(interaction_id = %interaction.id, "processing 'days'");
                self.handle_days(&interaction, now_unix).await
            }
            (InteractionKind::Command, Some(command)) if command.name == RESET_COMMAND => {
                info!(interaction_id = %interaction.id, "processing 'reset'");
                self.handle_reset(&interaction, command, now_unix).await
            }
            (kind, command) => {
                warn!(
                    ?kind,
                    command = command.as_ref().map(|command| command.name.as_str()),
                    "unrecognized interaction"
                );
                RouteOutcome::rejected(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UNKNOWN_INTERACTION_MESSAGE,
                )
            }
        }
    }

    async fn handle_days(&self, interaction: &Interaction, now_unix: i64) -> RouteOutcome {
        let today = start_of_utc_day(now_unix);
        let reply = match self.bounded(self.store.get_last()).await {
            Ok(Some(record)) => {
                debug!(
                    last_time = record.last_time,
                    last_description = %record.last_description,
                    "fetched last incident"
                );
                render_days_reply(&record, today)
            }
            Ok(None) => {
                info!("no incident has been recorded yet");
                DAYS_FALLBACK_REPLY.to_string()
            }
            Err(error) => {
                warn!(%error, "failed to read last incident, replying with fallback");
                DAYS_FALLBACK_REPLY.to_string()
            }
        };

        self.reply(interaction, reply).await;
        RouteOutcome::Acknowledged
    }

    async fn handle_reset(
        &self,
        interaction: &Interaction,
        command: &CommandInvocation,
        now_unix: i64,
    ) -> RouteOutcome {
        let today = start_of_utc_day(now_unix);
        let reason = reset_reason(command);
        let description = reason.as_deref().unwrap_or(UNKNOWN_INCIDENT_DESCRIPTION);

        match self.store.set_last(today, description).await {
            Ok(entry) => {
                info!(entry_id = %entry.id, time = entry.time, "recorded incident");
                self.reply(interaction, RESET_CONFIRMATION_REPLY).await;
                RouteOutcome::Acknowledged
            }
            Err(error) => {
                error!(%error, "failed to record incident");
                self.reply(interaction, RESET_FAILURE_REPLY).await;
                RouteOutcome::rejected(StatusCode::INTERNAL_SERVER_ERROR, RESET_FAILED_MESSAGE)
            }
        }
    }

    async fn reply(&self, interaction: &Interaction, content: impl Into<String>) {
        let callback = InteractionCallback::channel_message(content);
        match self
            .responder
            .send(&interaction.id, &interaction.token, &callback)
            .await
        {
            Ok(()) => debug!(interaction_id = %interaction.id, "sent interaction reply"),
            Err(error) => warn!(
                interaction_id = %interaction.id,
                error = %format!("{error:#}"),
                "failed to send interaction reply"
            ),
        }
    }

    /// Bounds a store read. Writes are awaited to completion so the reply always
    /// matches what the backend committed; each backend bounds its own lock waits.
    async fn bounded<T>(&self, operation: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.store_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(IncidentStoreError::Timeout(
                u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

fn render_days_reply(record: &IncidentRecord, today_midnight: i64) -> String {
    let days = elapsed_whole_days(record.last_time, today_midnight);
    format!(
        "It has been {days} day(s) since the last incident. The last incident was {}",
        record.last_description
    )
}

/// Reason supplied with `reset`, if any. Only an empty string counts as absent.
fn reset_reason(command: &CommandInvocation) -> Option<String> {
    let reason = match command.option_value(REASON_OPTION)? {
        Value::String(text) => text.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!reason.is_empty()).then_some(reason)
}
