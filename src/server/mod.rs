// HTTP server for the companion call service
//
// Two routes do the real work: /update_context folds caller context into a
// persona, /outbound_call dials a number with the configured assistant.

mod error;
mod handlers;
mod throttle;

pub use error::{ApiError, EXTERNAL_FAILURE_MESSAGE};
pub use handlers::{
    health_check, list_personas, outbound_call, update_context, OutboundCallRequest,
    UpdateContextRequest,
};
pub use throttle::CallThrottle;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::assistant::{AssistantConfigurator, AssistantIdentity};
use crate::config::constants::{
    DEFAULT_CALL_BURST, DEFAULT_CALL_REFILL_SECS, DEFAULT_PERSONA, DEFAULT_SAFE_PHRASE,
};
use crate::config::Config;
use crate::persona::PersonaRegistry;

/// State shared by every handler
pub struct AppState {
    pub registry: Arc<PersonaRegistry>,
    pub configurator: AssistantConfigurator,
    /// Assistant that outbound calls and updates target
    pub identity: AssistantIdentity,
    /// Phone number resource calls are placed from
    pub phone_id: String,
    /// Persona used when a request omits `voice`
    pub default_persona: String,
    pub throttle: CallThrottle,
    /// Push persona changes to the assistant after each context update
    pub sync_on_update: bool,
    /// Held from preview to commit while syncing, so the assistant always
    /// receives the newest persona text and updates land one at a time
    pub sync_lock: Mutex<()>,
    pub safe_phrase: String,
    pub transfer_number: Option<String>,
    pub voice_override: Option<String>,
}

impl AppState {
    pub fn new(
        registry: Arc<PersonaRegistry>,
        configurator: AssistantConfigurator,
        identity: AssistantIdentity,
        phone_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            configurator,
            identity,
            phone_id: phone_id.into(),
            default_persona: DEFAULT_PERSONA.to_string(),
            throttle: CallThrottle::new(
                DEFAULT_CALL_BURST,
                Duration::from_secs(DEFAULT_CALL_REFILL_SECS),
            ),
            sync_on_update: false,
            sync_lock: Mutex::new(()),
            safe_phrase: DEFAULT_SAFE_PHRASE.to_string(),
            transfer_number: None,
            voice_override: None,
        }
    }

    /// Build state from a validated `Config`
    pub fn from_config(
        config: &Config,
        registry: Arc<PersonaRegistry>,
        configurator: AssistantConfigurator,
        identity: AssistantIdentity,
    ) -> Result<Self> {
        let mut state = Self::new(registry, configurator, identity, config.phone_id()?);
        state.default_persona = config.server.default_persona.clone();
        state.throttle = CallThrottle::new(
            config.server.call_burst,
            Duration::from_secs(config.server.call_refill_secs),
        );
        state.sync_on_update = config.server.sync_assistant_on_update;
        state.safe_phrase = config.call.safe_phrase.clone();
        state.transfer_number = config.call.transfer_number.clone();
        state.voice_override = config.call.voice_id.clone();
        Ok(state)
    }

    pub fn with_default_persona(mut self, persona: impl Into<String>) -> Self {
        self.default_persona = persona.into();
        self
    }

    pub fn with_throttle(mut self, throttle: CallThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Enable assistant sync on context updates
    pub fn with_sync(
        mut self,
        safe_phrase: impl Into<String>,
        transfer_number: impl Into<String>,
    ) -> Self {
        self.sync_on_update = true;
        self.safe_phrase = safe_phrase.into();
        self.transfer_number = Some(transfer_number.into());
        self
    }
}

/// Router with every route; layers are added by `serve`
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/update_context", post(update_context))
        .route("/outbound_call", post(outbound_call))
        .route("/personas", get(list_personas))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<AppState>, bind_address: &str, body_limit: usize) -> Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind_address))?;

    // Idle throttle buckets would otherwise accumulate forever
    let throttle = state.throttle.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(3600));
        loop {
            tick.tick().await;
            throttle.purge_idle(Duration::from_secs(24 * 3600));
            tracing::debug!(tracked = throttle.tracked_numbers(), "Purged idle call buckets");
        }
    });

    let app = create_router(state)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Starting safewalk server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
