// HTTP handlers for context updates and outbound calls

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::AppState;
use crate::assistant::{build_config, validate_phone_number};
use crate::errors::{CoreError, CoreResult};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContextRequest {
    #[serde(default)]
    pub context: Option<String>,
    /// Persona key; falls back to the server's default persona
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutboundCallRequest {
    #[serde(default)]
    pub number: Option<String>,
}

/// POST /update_context
///
/// Appends the caller's context to a persona. An unknown persona is logged and
/// skipped; the request still succeeds. With assistant sync enabled the merged
/// text is stored only after the assistant accepted it.
pub async fn update_context(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateContextRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;

    let context = request
        .context
        .filter(|c| !c.is_empty())
        .ok_or(CoreError::MissingInput("No context provided"))?;
    let voice = request
        .voice
        .unwrap_or_else(|| state.default_persona.clone());

    let result = if state.sync_on_update {
        augment_and_sync(&state, &voice, &context).await
    } else {
        state.registry.augment(&voice, &context)
    };

    match result {
        Ok(text) => {
            tracing::info!(
                persona = %voice,
                chars = text.chars().count(),
                "Updated persona context"
            );
        }
        Err(CoreError::UnknownPersona(key)) => {
            tracing::warn!("Voice not found in personas: {}", key);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Json(json!({ "message": "Context received" })))
}

/// Merge, push the result to the assistant, then store it
async fn augment_and_sync(state: &AppState, voice: &str, context: &str) -> CoreResult<String> {
    let _guard = state.sync_lock.lock().await;

    let pending = state.registry.preview_augment(voice, context)?;
    sync_assistant(state, voice, pending.text()).await?;
    state.registry.commit(pending)
}

/// Push a persona text to the assistant
async fn sync_assistant(state: &AppState, voice: &str, text: &str) -> CoreResult<()> {
    let voice_id = match &state.voice_override {
        Some(v) => v.clone(),
        None => state
            .registry
            .voice_for(voice)?
            .map(str::to_string)
            .ok_or_else(|| CoreError::invalid_parameter("voice_id", "persona has no voice"))?,
    };
    let transfer_number = state
        .transfer_number
        .clone()
        .ok_or_else(|| CoreError::invalid_parameter("transfer_number", "not configured"))?;

    let config = build_config(text, voice_id, state.safe_phrase.clone(), transfer_number)?;
    state.configurator.apply(&config, &state.identity).await?;
    Ok(())
}

/// POST /outbound_call
pub async fn outbound_call(
    State(state): State<Arc<AppState>>,
    body: Result<Json<OutboundCallRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;

    let number = request
        .number
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(CoreError::MissingInput("No phone number provided"))?;
    validate_phone_number("number", &number)?;

    if !state.throttle.check(&number) {
        return Err(ApiError::TooManyRequests(
            "Call budget exhausted for this number".to_string(),
        ));
    }

    let call = state
        .configurator
        .place_call(&state.identity, &number, &state.phone_id)
        .await?;

    Ok(Json(json!({ "message": "Call initiated", "call_id": call.id })))
}

/// GET /personas
pub async fn list_personas(State(state): State<Arc<AppState>>) -> Json<Value> {
    let keys: Vec<String> = state.registry.list_keys().into_iter().collect();
    Json(json!({ "personas": keys, "default": state.default_persona }))
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
