// Configuration structs

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use super::constants::*;
use crate::assistant::{validate_phone_number, ModelSettings};
use crate::persona::{PersonaKind, RegistryLimits};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Assistant platform credentials and identifiers
    pub vapi: VapiSettings,

    /// HTTP server (`safewalk serve`)
    pub server: ServerSettings,

    /// Safe phrase, transfer number and persona for assistant updates
    pub call: CallSettings,

    /// Model and voice provider written into every assistant update
    pub model: ModelSection,

    /// Size limits for caller-supplied context
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VapiSettings {
    /// API token (env: VAPI_TOKEN)
    pub token: Option<String>,
    /// REST base URL (env: VAPI_BASE_URL)
    pub base_url: String,
    /// Phone number resource outbound calls are placed from (env: PHONE_ID)
    pub phone_id: Option<String>,
    /// Permanent assistant id to configure and call with (env: PERMANENT_ID)
    pub assistant_id: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for VapiSettings {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_VAPI_BASE_URL.to_string(),
            phone_id: None,
            assistant_id: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address (e.g., "0.0.0.0:5000")
    pub bind_address: String,
    /// Persona `/update_context` uses when `voice` is omitted
    pub default_persona: String,
    /// Push the augmented persona to the assistant after each context update
    pub sync_assistant_on_update: bool,
    /// Calls allowed back-to-back to one number
    pub call_burst: u32,
    /// Seconds to earn back one call to a number
    pub call_refill_secs: u64,
    /// Maximum request body size in bytes
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_HTTP_ADDR.to_string(),
            default_persona: DEFAULT_PERSONA.to_string(),
            sync_assistant_on_update: false,
            call_burst: DEFAULT_CALL_BURST,
            call_refill_secs: DEFAULT_CALL_REFILL_SECS,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallSettings {
    /// Phrase that triggers the transfer tool (env: SAFE_PHRASE)
    pub safe_phrase: String,
    /// Emergency contact the call is transferred to (env: TRANSFER_NUMBER)
    pub transfer_number: Option<String>,
    /// Persona applied by `safewalk configure` without `--persona`
    pub persona: String,
    /// Voice override; when unset the persona's own voice is used
    pub voice_id: Option<String>,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            safe_phrase: DEFAULT_SAFE_PHRASE.to_string(),
            transfer_number: None,
            persona: DEFAULT_CONFIGURE_PERSONA.to_string(),
            voice_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub provider: String,
    pub model: String,
    pub voice_provider: String,
    pub first_message: String,
}

impl Default for ModelSection {
    fn default() -> Self {
        let defaults = ModelSettings::default();
        Self {
            provider: defaults.provider,
            model: defaults.model,
            voice_provider: defaults.voice_provider,
            first_message: defaults.first_message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub max_fragment_chars: usize,
    pub max_persona_chars: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        let defaults = RegistryLimits::default();
        Self {
            max_fragment_chars: defaults.max_fragment_chars,
            max_persona_chars: defaults.max_persona_chars,
        }
    }
}

impl Config {
    /// Startup validation. Missing credentials are fatal.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut missing = Vec::new();
        if is_blank(&self.vapi.token) {
            missing.push("VAPI_TOKEN (vapi.token)");
        }
        if is_blank(&self.vapi.phone_id) {
            missing.push("PHONE_ID (vapi.phone_id)");
        }
        if is_blank(&self.vapi.assistant_id) {
            missing.push("PERMANENT_ID (vapi.assistant_id)");
        }
        if !missing.is_empty() {
            bail!(
                "Missing required configuration:\n  {}\n\n\
                 Set them in the environment, a .env file, or ~/.safewalk/config.toml",
                missing.join("\n  ")
            );
        }

        self.server
            .bind_address
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address: '{}'", self.server.bind_address))?;

        self.server
            .default_persona
            .parse::<PersonaKind>()
            .context("Invalid server.default_persona")?;
        self.call
            .persona
            .parse::<PersonaKind>()
            .context("Invalid call.persona")?;

        if let Some(number) = &self.call.transfer_number {
            validate_phone_number("transfer_number", number)
                .context("Invalid call.transfer_number")?;
        }
        if self.server.sync_assistant_on_update && self.call.transfer_number.is_none() {
            bail!(
                "server.sync_assistant_on_update requires call.transfer_number (TRANSFER_NUMBER)"
            );
        }

        if self.vapi.request_timeout_secs == 0 {
            bail!("vapi.request_timeout_secs must be greater than 0");
        }
        if self.server.call_burst == 0 {
            bail!("server.call_burst must be greater than 0");
        }
        if self.limits.max_fragment_chars == 0
            || self.limits.max_fragment_chars > self.limits.max_persona_chars
        {
            bail!(
                "limits.max_fragment_chars ({}) must be 1..=limits.max_persona_chars ({})",
                self.limits.max_fragment_chars,
                self.limits.max_persona_chars
            );
        }

        Ok(())
    }

    pub fn token(&self) -> anyhow::Result<&str> {
        required(&self.vapi.token, "VAPI_TOKEN")
    }

    pub fn phone_id(&self) -> anyhow::Result<&str> {
        required(&self.vapi.phone_id, "PHONE_ID")
    }

    pub fn assistant_id(&self) -> anyhow::Result<&str> {
        required(&self.vapi.assistant_id, "PERMANENT_ID")
    }

    pub fn transfer_number(&self) -> anyhow::Result<&str> {
        required(&self.call.transfer_number, "TRANSFER_NUMBER")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.vapi.request_timeout_secs)
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            provider: self.model.provider.clone(),
            model: self.model.model.clone(),
            voice_provider: self.model.voice_provider.clone(),
            first_message: self.model.first_message.clone(),
        }
    }

    pub fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits {
            max_fragment_chars: self.limits.max_fragment_chars,
            max_persona_chars: self.limits.max_persona_chars,
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn required<'a>(value: &'a Option<String>, name: &str) -> anyhow::Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("{} is not configured", name),
    }
}
