// Assistant configuration: persona text + call parameters -> platform payload

use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::types::{
    AssistantHandle, AssistantIdentity, AssistantMetadata, AssistantUpdate, CallHandle,
    CallRequest, ChatMessage, Customer, Destination, ModelConfig, Tool, VoiceConfig,
};
use super::AssistantClient;
use crate::config::constants::{DEFAULT_FIRST_MESSAGE, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::errors::{CoreError, CoreResult};

/// E.164: leading '+', country code, at most 15 digits total
static E164: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").unwrap());

/// Model, voice provider and greeting shared by every update
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub provider: String,
    pub model: String,
    pub voice_provider: String,
    pub first_message: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            voice_provider: "playht".to_string(),
            first_message: DEFAULT_FIRST_MESSAGE.to_string(),
        }
    }
}

/// One assistant update, assembled per request and then discarded
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub persona_text: String,
    pub voice_id: String,
    pub safe_phrase: String,
    pub transfer_number: String,
}

impl AssistantConfig {
    /// System prompt: the persona followed by the safe-phrase instruction
    pub fn system_prompt(&self) -> String {
        format!(
            "{} if you hear {} use the 'transferCall' tool.",
            self.persona_text, self.safe_phrase
        )
    }

    /// Render the platform payload
    pub fn to_update(&self, settings: &ModelSettings) -> AssistantUpdate {
        AssistantUpdate {
            model: ModelConfig {
                provider: settings.provider.clone(),
                model: settings.model.clone(),
                messages: vec![ChatMessage::system(self.system_prompt())],
                tools: vec![Tool::TransferCall {
                    destinations: vec![Destination::Number {
                        number: self.transfer_number.clone(),
                    }],
                }],
            },
            voice: VoiceConfig {
                provider: settings.voice_provider.clone(),
                voice_id: self.voice_id.clone(),
            },
            first_message: settings.first_message.clone(),
            metadata: AssistantMetadata {
                context: self.persona_text.clone(),
                safe_word: self.safe_phrase.clone(),
            },
        }
    }
}

/// Validate the parameters and assemble an `AssistantConfig`. No I/O.
pub fn build_config(
    persona_text: impl Into<String>,
    voice_id: impl Into<String>,
    safe_phrase: impl Into<String>,
    transfer_number: impl Into<String>,
) -> CoreResult<AssistantConfig> {
    let config = AssistantConfig {
        persona_text: persona_text.into(),
        voice_id: voice_id.into().trim().to_string(),
        safe_phrase: safe_phrase.into().trim().to_string(),
        transfer_number: transfer_number.into().trim().to_string(),
    };

    if config.persona_text.trim().is_empty() {
        return Err(CoreError::invalid_parameter("persona_text", "must not be empty"));
    }
    if config.voice_id.is_empty() {
        return Err(CoreError::invalid_parameter("voice_id", "must not be empty"));
    }
    if config.safe_phrase.is_empty() {
        return Err(CoreError::invalid_parameter("safe_phrase", "must not be empty"));
    }
    validate_phone_number("transfer_number", &config.transfer_number)?;

    Ok(config)
}

/// Reject anything that is not an E.164 number
pub fn validate_phone_number(name: &'static str, number: &str) -> CoreResult<()> {
    if number.is_empty() {
        return Err(CoreError::invalid_parameter(name, "must not be empty"));
    }
    if !E164.is_match(number) {
        return Err(CoreError::invalid_parameter(
            name,
            format!("'{}' is not an E.164 phone number", number),
        ));
    }
    Ok(())
}

/// Submits configurations and call requests to the assistant platform.
///
/// Stateless per call. Each request gets exactly one attempt bounded by
/// `timeout`; the platform bills per call, so nothing is retried.
#[derive(Clone)]
pub struct AssistantConfigurator {
    client: Arc<dyn AssistantClient>,
    settings: ModelSettings,
    timeout: Duration,
}

impl AssistantConfigurator {
    pub fn new(client: Arc<dyn AssistantClient>) -> Self {
        Self {
            client,
            settings: ModelSettings::default(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Confirm the permanent assistant exists and return its identity
    pub async fn resolve_identity(&self, permanent_id: &str) -> CoreResult<AssistantIdentity> {
        if permanent_id.trim().is_empty() {
            return Err(CoreError::invalid_parameter("assistant_id", "must not be empty"));
        }
        let handle = self
            .bounded("assistant lookup", self.client.get_assistant(permanent_id))
            .await?;
        tracing::info!(assistant = %handle.id, "Found existing assistant");
        Ok(AssistantIdentity::new(handle.id))
    }

    /// Push `config` to the assistant identified by `identity`
    pub async fn apply(
        &self,
        config: &AssistantConfig,
        identity: &AssistantIdentity,
    ) -> CoreResult<AssistantHandle> {
        let update = config.to_update(&self.settings);
        let handle = self
            .bounded(
                "assistant update",
                self.client.update_assistant(identity.as_str(), &update),
            )
            .await?;
        tracing::info!(assistant = %handle.id, voice = %config.voice_id, "Assistant updated");
        Ok(handle)
    }

    /// Dial `number` from the phone resource `phone_id` using `identity`
    pub async fn place_call(
        &self,
        identity: &AssistantIdentity,
        number: &str,
        phone_id: &str,
    ) -> CoreResult<CallHandle> {
        validate_phone_number("number", number)?;
        let request = CallRequest {
            assistant_id: identity.as_str().to_string(),
            phone_number_id: phone_id.to_string(),
            customer: Customer {
                number: number.to_string(),
            },
        };
        let call = self
            .bounded("outbound call", self.client.create_call(&request))
            .await?;
        tracing::info!(call_id = %call.id, "Outbound call initiated");
        Ok(call)
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> CoreResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CoreError::ExternalService(
                e.context(format!("{} failed", what)),
            )),
            Err(_) => Err(CoreError::ExternalService(anyhow::anyhow!(
                "{} timed out after {:?}",
                what,
                self.timeout
            ))),
        }
    }
}
