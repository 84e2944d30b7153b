use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub messaging: MessagingConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Messaging service endpoint and credentials. The token is injected
/// configuration; set it via `VOICEDROP_MESSAGING__TOKEN` rather than
/// the config file.
#[derive(Debug, Deserialize)]
pub struct MessagingConfig {
    pub base_url: String,
    pub api_version: String,
    #[serde(default)]
    pub token: String,
}

/// File-backed capture source settings for the demo binary.
#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    /// Audio file streamed as the microphone input.
    pub input_path: String,
    /// Bytes per emitted chunk.
    pub chunk_bytes: usize,
    /// Delay between chunks, in milliseconds.
    pub chunk_interval_ms: u64,
    /// Ambient addressing context the delivery pipeline resolves
    /// recipient ids from.
    pub conversation_path: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VOICEDROP").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
