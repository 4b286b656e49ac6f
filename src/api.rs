use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::form::SaveRequest;
use crate::model::{AppConfig, AppEvent, Secret};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("invalid secret name '{0}'")]
    InvalidSecretName(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Deserialize)]
struct GetSecretsResponse {
    #[serde(default)]
    custom_secrets: Vec<Secret>,
}

#[derive(Debug, Serialize)]
struct CreateSecretRequest<'a> {
    name: &'a str,
    value: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateSecretRequest<'a> {
    name: &'a str,
    description: &'a str,
}

/// Thin client for the settings endpoints of the agent server.
#[derive(Debug, Clone)]
pub struct SettingsClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl SettingsClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
        })
    }

    /// Path segment for a secret. Dot segments are dropped by the URL
    /// normaliser and would address the collection instead.
    fn secret_segment(name: &str) -> Result<&str, ApiError> {
        match name {
            "" | "." | ".." => Err(ApiError::InvalidSecretName(name.to_string())),
            _ => Ok(name),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let builder = self.client.request(method, self.url(segments)?);
        Ok(match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        })
    }

    async fn send(builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::Status { status, body })
        }
    }

    pub async fn get_secrets(&self) -> Result<Vec<Secret>, ApiError> {
        debug!("GET secrets");
        let resp = Self::send(self.request(Method::GET, &["api", "secrets"])?).await?;
        let page: GetSecretsResponse = resp.json().await?;
        Ok(page.custom_secrets)
    }

    pub async fn create_secret(
        &self,
        name: &str,
        value: &str,
        description: &str,
    ) -> Result<(), ApiError> {
        debug!("POST secret '{}'", name);
        let body = CreateSecretRequest {
            name,
            value,
            description,
        };
        Self::send(self.request(Method::POST, &["api", "secrets"])?.json(&body)).await?;
        Ok(())
    }

    pub async fn update_secret(
        &self,
        original_name: &str,
        name: &str,
        description: &str,
    ) -> Result<(), ApiError> {
        debug!("PUT secret '{}' (new name '{}')", original_name, name);
        let body = UpdateSecretRequest { name, description };
        Self::send(
            self.request(
                Method::PUT,
                &["api", "secrets", Self::secret_segment(original_name)?],
            )?
                .json(&body),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_secret(&self, name: &str) -> Result<(), ApiError> {
        debug!("DELETE secret '{}'", name);
        let segment = Self::secret_segment(name)?;
        Self::send(self.request(Method::DELETE, &["api", "secrets", segment])?).await?;
        Ok(())
    }

    pub async fn get_config(&self) -> Result<AppConfig, ApiError> {
        let resp = Self::send(self.request(Method::GET, &["api", "options", "config"])?).await?;
        let data: Value = resp.json().await?;
        Ok(AppConfig::from_mode_str(
            data["APP_MODE"].as_str().unwrap_or_default(),
        ))
    }

    /// Identifiers of git providers the user has connected.
    pub async fn get_providers(&self) -> Result<Vec<String>, ApiError> {
        let resp = Self::send(self.request(Method::GET, &["api", "settings"])?).await?;
        let data: Value = resp.json().await?;
        let mut providers: Vec<String> = data["provider_tokens_set"]
            .as_object()
            .map(|set| set.keys().cloned().collect())
            .unwrap_or_default();
        providers.sort();
        Ok(providers)
    }
}

/// Fetch config and providers concurrently and report each result.
pub async fn bootstrap(client: Arc<SettingsClient>, tx: UnboundedSender<AppEvent>) {
    debug!("Bootstrap fetch started");
    let (config, providers) = futures::join!(client.get_config(), client.get_providers());
    match config {
        Ok(config) => {
            let _ = tx.send(AppEvent::ConfigLoaded(config));
        }
        Err(e) => {
            let _ = tx.send(AppEvent::Message(format!("Failed to load config: {}", e)));
        }
    }
    match providers {
        Ok(providers) => {
            let _ = tx.send(AppEvent::ProvidersLoaded(providers));
        }
        Err(e) => {
            let _ = tx.send(AppEvent::Message(format!("Failed to load providers: {}", e)));
        }
    }
    debug!("Bootstrap fetch done");
}

pub async fn fetch_secrets(client: Arc<SettingsClient>, tx: UnboundedSender<AppEvent>) {
    match client.get_secrets().await {
        Ok(secrets) => {
            debug!("Fetched {} secrets", secrets.len());
            let _ = tx.send(AppEvent::SecretsLoaded(secrets));
        }
        Err(e) => {
            let _ = tx.send(AppEvent::SecretsFetchFailed(e.to_string()));
        }
    }
}

pub async fn delete_secret(client: Arc<SettingsClient>, tx: UnboundedSender<AppEvent>, name: String) {
    let result = client.delete_secret(&name).await.map_err(|e| e.to_string());
    let _ = tx.send(AppEvent::DeleteSettled { name, result });
}

pub async fn save_secret(client: Arc<SettingsClient>, tx: UnboundedSender<AppEvent>, req: SaveRequest) {
    let result = match &req {
        SaveRequest::Create {
            name,
            value,
            description,
        } => client
            .create_secret(name, value, description)
            .await
            .map(|_| name.clone()),
        SaveRequest::Update {
            original,
            name,
            description,
        } => client
            .update_secret(original, name, description)
            .await
            .map(|_| name.clone()),
    };
    match result {
        Ok(name) => {
            let _ = tx.send(AppEvent::SecretSaved(name));
        }
        Err(e) => {
            let _ = tx.send(AppEvent::SecretSaveFailed(e.to_string()));
        }
    }
}
