// Project-wide constants
//
// Centralised here so ports, limits and API defaults have one source of
// truth. Import via `use crate::config::constants::*;`.

/// Default bind address for the HTTP server (all interfaces, like the phone
/// app expects when it posts context over the LAN).
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:5000";

/// Base URL of the assistant platform's REST API.
pub const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";

/// Upper bound on any single request to the assistant platform.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Persona used by `/update_context` when the request names none.
pub const DEFAULT_PERSONA: &str = "female_friend";

/// Persona the `configure` command applies when none is given.
pub const DEFAULT_CONFIGURE_PERSONA: &str = "dad";

/// Phrase that makes the assistant transfer the call.
pub const DEFAULT_SAFE_PHRASE: &str = "Do you want to get pizza?";

/// First line the assistant speaks when the call connects.
pub const DEFAULT_FIRST_MESSAGE: &str = "Hey are you on your way home, where are you?";

/// Largest accepted JSON body on the HTTP server.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Outbound calls allowed back-to-back to the same number.
pub const DEFAULT_CALL_BURST: u32 = 3;

/// Seconds until one more call to the same number is allowed.
pub const DEFAULT_CALL_REFILL_SECS: u64 = 600;
