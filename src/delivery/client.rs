use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AttachmentUpload, MessageRecord, MessagingApi, OutboundMessage, ATTACHMENT_FILE_NAME};
use crate::config::MessagingConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the messaging service.
///
/// Every call carries the bearer credential and the service's dated
/// `Version` header; both come from injected configuration.
pub struct HttpMessagingClient {
    http: Client,
    base_url: String,
    token: String,
    api_version: String,
}

impl HttpMessagingClient {
    pub fn new(cfg: &MessagingConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
            api_version: cfg.api_version.clone(),
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
            .header("Version", &self.api_version)
    }
}

/// The history endpoint nests the message list one level deeper than
/// the path suggests: `{ messages: { messages: [...] } }`.
#[derive(Debug, Default, Deserialize)]
struct MessageHistoryResponse {
    #[serde(default)]
    messages: MessageHistoryEnvelope,
}

#[derive(Debug, Default, Deserialize)]
struct MessageHistoryEnvelope {
    #[serde(default)]
    messages: Vec<MessageRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    uploaded_files: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    r#type: &'a str,
    contact_id: &'a str,
    body: &'a str,
    attachments: [&'a str; 1],
}

#[async_trait]
impl MessagingApi for HttpMessagingClient {
    async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>> {
        let url = format!("{}/conversations/{}/messages", self.base_url, conversation_id);
        let res = self
            .authed(self.http.get(&url))
            .send()
            .await
            .context("message history request failed")?;

        if !res.status().is_success() {
            anyhow::bail!("message history request returned {}", res.status());
        }

        let body: MessageHistoryResponse = res
            .json()
            .await
            .context("message history response was not valid JSON")?;

        debug!(
            conversation_id,
            count = body.messages.messages.len(),
            "fetched conversation history"
        );
        Ok(body.messages.messages)
    }

    async fn upload_attachment(&self, upload: &AttachmentUpload<'_>) -> Result<String> {
        let part = Part::bytes(upload.artifact.bytes.clone())
            .file_name(ATTACHMENT_FILE_NAME)
            .mime_str(upload.artifact.mime_type)
            .context("invalid artifact mime type")?;

        let mut form = Form::new().part("uploadedFiles", part);
        if let Some(location_id) = upload.location_id {
            form = form.text("locationId", location_id.to_string());
        }
        form = form
            .text("contactId", upload.contact_id.to_string())
            .text("conversationId", upload.conversation_id.to_string());

        let url = format!("{}/conversations/messages/upload", self.base_url);
        let res = self
            .authed(self.http.post(&url))
            .multipart(form)
            .send()
            .await
            .context("upload request failed")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("upload returned {status}: {text}");
        }

        let body: UploadResponse = res
            .json()
            .await
            .context("upload response was not valid JSON")?;

        body.uploaded_files
            .into_values()
            .next()
            .ok_or_else(|| anyhow!("upload response contains no file url"))
    }

    async fn publish_message(&self, message: &OutboundMessage<'_>) -> Result<()> {
        let body = PublishRequest {
            r#type: "SMS",
            contact_id: message.contact_id,
            body: message.body,
            attachments: [message.attachment_url],
        };

        let url = format!("{}/conversations/messages", self.base_url);
        let res = self
            .authed(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .context("publish request failed")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("publish returned {status}: {text}");
        }

        Ok(())
    }
}
