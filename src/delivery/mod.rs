//! Delivery pipeline
//!
//! Four remote operations, strictly sequential, each gated on the one
//! before it: resolve the recipient from the ambient addressing
//! context, look up the conversation's contact, upload the encoded
//! artifact, publish a message referencing it.
//!
//! Missing recipient or contact is a frequent, benign outcome (the UI
//! simply isn't on a conversation), so steps 1-2 skip silently. Steps
//! 3-4 run after we've committed to sending, so their failures are
//! hard errors, reported and never retried here.

pub mod client;

pub use client::HttpMessagingClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::audio::EncodedArtifact;
use crate::error::PipelineError;

/// Message body attached alongside the uploaded memo.
pub const MEMO_MESSAGE_BODY: &str = "\u{1F3A4} Voice memo";

/// File name the artifact is uploaded under.
pub const ATTACHMENT_FILE_NAME: &str = "audio.mp3";

/// Where a recording should be delivered, resolved per stop cycle.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub location_id: Option<String>,
    pub conversation_id: String,
    pub contact_id: Option<String>,
}

/// One message from a conversation's history, as returned by the
/// messaging service. Only the contact reference matters here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(default)]
    pub contact_id: Option<String>,
}

/// Multipart upload request for an encoded artifact.
pub struct AttachmentUpload<'a> {
    pub artifact: &'a EncodedArtifact,
    pub location_id: Option<&'a str>,
    pub contact_id: &'a str,
    pub conversation_id: &'a str,
}

/// Outbound message referencing an uploaded artifact.
pub struct OutboundMessage<'a> {
    pub contact_id: &'a str,
    pub body: &'a str,
    pub attachment_url: &'a str,
}

/// The remote messaging service, bearer-token authenticated.
///
/// A trait so session and pipeline tests can substitute fakes, the
/// same seam the audio backends use.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Message history for a conversation, newest ordering as served.
    async fn conversation_messages(&self, conversation_id: &str)
        -> anyhow::Result<Vec<MessageRecord>>;

    /// Upload an artifact; returns the hosted file URL.
    async fn upload_attachment(&self, upload: &AttachmentUpload<'_>) -> anyhow::Result<String>;

    /// Publish a message into the contact's conversation.
    async fn publish_message(&self, message: &OutboundMessage<'_>) -> anyhow::Result<()>;
}

/// Ambient addressing context, e.g. the navigation path of the host
/// page. External collaborator; `None` means "nowhere to deliver".
pub trait AddressSource: Send + Sync {
    fn current_path(&self) -> Option<String>;
}

/// Fixed addressing context, handed in at startup.
pub struct StaticAddress(Option<String>);

impl StaticAddress {
    pub fn new(path: impl Into<Option<String>>) -> Self {
        Self(path.into())
    }
}

impl AddressSource for StaticAddress {
    fn current_path(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Pull `locationId` and `conversationId` out of a navigation path.
///
/// The segment after `location` names the location; the segment after
/// the *last* `conversations` names the conversation. Either may be
/// absent.
pub fn resolve_ids(path: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let location_id = parts
        .iter()
        .position(|s| *s == "location")
        .and_then(|i| parts.get(i + 1))
        .map(|s| s.to_string());

    let conversation_id = parts
        .iter()
        .rposition(|s| *s == "conversations")
        .and_then(|i| parts.get(i + 1))
        .map(|s| s.to_string());

    (location_id, conversation_id)
}

/// Why a delivery was skipped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No conversation id resolvable from the addressing context.
    NoConversation,
    /// The conversation's history yielded no contact id.
    NoContact,
}

/// What happened to a finished recording.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered(DeliveryResult),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub uploaded_url: String,
    pub message_published: bool,
}

/// Sequences the four remote calls for one artifact.
pub struct DeliveryPipeline {
    api: Arc<dyn MessagingApi>,
    address: Arc<dyn AddressSource>,
}

impl DeliveryPipeline {
    pub fn new(api: Arc<dyn MessagingApi>, address: Arc<dyn AddressSource>) -> Self {
        Self { api, address }
    }

    /// Deliver one encoded artifact. Short-circuits on the first
    /// failed step; no step is retried.
    pub async fn deliver(
        &self,
        artifact: &EncodedArtifact,
    ) -> Result<DeliveryOutcome, PipelineError> {
        // Step 1: recipient resolution
        let path = self.address.current_path().unwrap_or_default();
        let (location_id, conversation_id) = resolve_ids(&path);
        let Some(conversation_id) = conversation_id else {
            debug!("no conversation in addressing context, skipping delivery");
            return Ok(DeliveryOutcome::Skipped(SkipReason::NoConversation));
        };

        // Step 2: contact resolution. Lookup failures are treated the
        // same as an empty history.
        let contact_id = match self.api.conversation_messages(&conversation_id).await {
            Ok(messages) => messages.into_iter().find_map(|m| m.contact_id),
            Err(e) => {
                debug!("message history lookup failed: {e:#}");
                None
            }
        };
        let Some(contact_id) = contact_id else {
            debug!(%conversation_id, "no contact in conversation history, skipping delivery");
            return Ok(DeliveryOutcome::Skipped(SkipReason::NoContact));
        };

        let context = ConversationContext {
            location_id,
            conversation_id,
            contact_id: Some(contact_id),
        };
        debug!(conversation_id = %context.conversation_id, "recipient resolved");

        // Step 3: artifact upload
        let upload = AttachmentUpload {
            artifact,
            location_id: context.location_id.as_deref(),
            contact_id: context.contact_id.as_deref().unwrap_or_default(),
            conversation_id: &context.conversation_id,
        };
        let uploaded_url = self.api.upload_attachment(&upload).await.map_err(|e| {
            error!("attachment upload failed: {e:#}");
            PipelineError::Upload(format!("{e:#}"))
        })?;

        // Step 4: message publish
        let message = OutboundMessage {
            contact_id: upload.contact_id,
            body: MEMO_MESSAGE_BODY,
            attachment_url: &uploaded_url,
        };
        self.api.publish_message(&message).await.map_err(|e| {
            error!("message publish failed: {e:#}");
            PipelineError::Publish(format!("{e:#}"))
        })?;

        info!(
            conversation_id = %context.conversation_id,
            %uploaded_url,
            "voice memo delivered"
        );

        Ok(DeliveryOutcome::Delivered(DeliveryResult {
            uploaded_url,
            message_published: true,
        }))
    }
}
