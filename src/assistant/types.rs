// Wire types for the assistant platform
//
// Field names follow the platform's REST API (camelCase), except `metadata`
// which is free-form and keeps the keys the dashboard already shows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The platform's handle for a configured assistant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssistantIdentity(String);

impl AssistantIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssistantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Partial assistant update (PATCH body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantUpdate {
    pub model: ModelConfig,
    pub voice: VoiceConfig,
    pub first_message: String,
    pub metadata: AssistantMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Tool {
    /// Hand the live call over to one of `destinations`
    #[serde(rename = "transferCall")]
    TransferCall { destinations: Vec<Destination> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Destination {
    Number { number: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub provider: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMetadata {
    pub context: String,
    pub safe_word: String,
}

/// What the platform returns for GET/PATCH on an assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantHandle {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Outbound call request (POST /call body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub assistant_id: String,
    pub phone_number_id: String,
    pub customer: Customer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallHandle {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}
