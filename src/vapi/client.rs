// HTTP client for the Vapi REST API

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::assistant::{AssistantClient, AssistantHandle, AssistantUpdate, CallHandle, CallRequest};

pub struct VapiClient {
    client: Client,
    token: String,
    base_url: String,
}

impl VapiClient {
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    /// Send once and decode a JSON body; non-2xx becomes an error with status and body
    async fn send<T: DeserializeOwned>(&self, label: &str, request: RequestBuilder) -> Result<T> {
        tracing::debug!("Sending {} request to Vapi", label);

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to Vapi", label))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Vapi {} request failed\n\nStatus: {}\nBody: {}",
                label,
                status,
                error_body
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse Vapi {} response", label))
    }
}

#[async_trait]
impl AssistantClient for VapiClient {
    async fn get_assistant(&self, id: &str) -> Result<AssistantHandle> {
        let request = self.request(Method::GET, &format!("/assistant/{}", id));
        self.send("get assistant", request).await
    }

    async fn update_assistant(
        &self,
        id: &str,
        update: &AssistantUpdate,
    ) -> Result<AssistantHandle> {
        let request = self
            .request(Method::PATCH, &format!("/assistant/{}", id))
            .json(update);
        self.send("update assistant", request).await
    }

    async fn create_call(&self, request: &CallRequest) -> Result<CallHandle> {
        let request = self.request(Method::POST, "/call").json(request);
        self.send("create call", request).await
    }
}
