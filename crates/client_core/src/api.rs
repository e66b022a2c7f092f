//! JSON transport against the console backend.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    error::ApiErrorBody,
    protocol::{LoginRequest, LoginResponse},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::Settings,
    error::{ClientError, ClientResult},
    session::TokenProvider,
};

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(settings: &Settings, tokens: Arc<dyn TokenProvider>) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: parse_base_url(&settings.api_base_url)?,
            tokens,
        })
    }

    pub fn with_base_url(base_url: &str, tokens: Arc<dyn TokenProvider>) -> ClientResult<Self> {
        Self::new(
            &Settings {
                api_base_url: base_url.to_string(),
                ..Settings::default()
            },
            tokens,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ClientError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let request = self.http.get(self.endpoint(path)?).query(query);
        let response = self.execute(request, true).await?;
        response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(format!("GET {path}: {err}")))
    }

    /// Sends a JSON body and discards whatever the backend answers with.
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<()> {
        let request = self.http.request(method, self.endpoint(path)?).json(body);
        self.execute(request, true).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let request = self.http.delete(self.endpoint(path)?);
        self.execute(request, true).await?;
        Ok(())
    }

    /// Credential exchange. Sent without a bearer token, and a `401` here
    /// means bad credentials rather than an expired session.
    pub async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        let builder = self.http.post(self.endpoint("auth/login")?).json(request);
        let response = self.execute(builder, false).await?;
        response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(format!("login: {err}")))
    }

    async fn execute(
        &self,
        mut request: RequestBuilder,
        authenticated: bool,
    ) -> ClientResult<Response> {
        if authenticated {
            if let Some(token) = self.tokens.current_token().await {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("api: {} {}", status.as_u16(), response.url().path());
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && authenticated {
            self.tokens.session_expired().await;
            return Err(ClientError::SessionExpired);
        }
        if status == StatusCode::FORBIDDEN {
            warn!("api: access denied for {}", response.url().path());
        }

        let text = response.text().await.unwrap_or_default();
        let message = ApiErrorBody::parse(&text).and_then(ApiErrorBody::into_message);
        Err(ClientError::rejected(status.as_u16(), message))
    }
}

fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized).map_err(|source| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
