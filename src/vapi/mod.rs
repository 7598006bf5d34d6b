// Vapi REST client
//
// Implements `AssistantClient` against the hosted voice assistant platform.

mod client;

pub use client::VapiClient;
