// Assistant platform abstraction
//
// The voice platform (assistant hosting, telephony, speech) is an external
// service. Everything in the crate talks to it through `AssistantClient`, so
// the HTTP layer and CLI can run against the real REST client or a test double.

use anyhow::Result;
use async_trait::async_trait;

pub mod configurator;
pub mod types;

pub use configurator::{
    build_config, validate_phone_number, AssistantConfig, AssistantConfigurator, ModelSettings,
};
pub use types::{
    AssistantHandle, AssistantIdentity, AssistantMetadata, AssistantUpdate, CallHandle,
    CallRequest, ChatMessage, Customer, Destination, ModelConfig, Tool, VoiceConfig,
};

/// Client for the assistant platform
///
/// Implementations report every failure (transport, auth, not-found) as an
/// error; callers wrap them into `CoreError::ExternalService`.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Look up an existing assistant by its permanent id
    async fn get_assistant(&self, id: &str) -> Result<AssistantHandle>;

    /// Apply a partial configuration update to an assistant
    async fn update_assistant(&self, id: &str, update: &AssistantUpdate)
        -> Result<AssistantHandle>;

    /// Ask the platform to dial out using an assistant
    async fn create_call(&self, request: &CallRequest) -> Result<CallHandle>;
}
