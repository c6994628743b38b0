//! REST client for the negotiation bot backend.
//!
//! The backend reports most failures inside a JSON body (`success: false`,
//! `error: "..."`), often with a 2xx status. Responses are therefore decoded
//! whatever their status; only bodies that are not JSON turn into
//! [`ApiError::Status`].

pub mod logs;
pub mod offers;
pub mod rules;
pub mod settings;
pub mod stats;

use crate::domain::ValidationError;
use log::debug;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use offers::{BatchStart, SyncSimpleReport, SyncWorkingReport};
pub use stats::Health;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response without `{0}`")]
    MissingField(&'static str),
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    /// The backend answered and said no.
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    /// Text for a toast. Backend rejections are shown verbatim, everything
    /// else is prefixed with what the user was trying to do.
    pub fn user_message(&self, context: &str) -> String {
        match self {
            ApiError::Rejected(msg) => msg.clone(),
            ApiError::Invalid(err) => err.to_string(),
            other => format!("{}: {}", context, other),
        }
    }
}

/// Generic `{success, message, error}` reply to a mutating call.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ActionReply {
    #[serde(default, deserialize_with = "crate::domain::wire::lenient_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionReply {
    /// `Ok(message)` on success, the backend's error text otherwise.
    pub fn into_result(self) -> Result<Option<String>, ApiError> {
        if self.success {
            Ok(self.message.filter(|m| !m.is_empty()))
        } else {
            Err(rejection(self.error, self.message))
        }
    }
}

pub(crate) fn rejection(error: Option<String>, message: Option<String>) -> ApiError {
    let text = error
        .filter(|e| !e.is_empty())
        .or(message.filter(|m| !m.is_empty()))
        .unwrap_or_else(|| "Unbekannter Fehler".to_string());
    ApiError::Rejected(text)
}

#[derive(Clone, Debug)]
pub struct BotClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BotClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join would drop the last segment of a base without trailing slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/api/<segments...>`, each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api");
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        self.send::<(), T>(Method::GET, url, None).await
    }

    pub(crate) async fn send<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("{} {}", method, url);
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        decode_body(status, &bytes)
    }
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<T, ApiError> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ApiError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(bytes).chars().take(200).collect(),
        }),
        Err(e) => Err(ApiError::Decode(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() {
        let client = BotClient::new("http://localhost:5000/bot", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(&["offers", "a/b", "respond"]).as_str(),
            "http://localhost:5000/bot/api/offers/a%2Fb/respond"
        );
        let root = BotClient::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        assert_eq!(root.endpoint(&["logs"]).as_str(), "http://localhost:5000/api/logs");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            BotClient::new("not a url", Duration::from_secs(1)),
            Err(ApiError::BaseUrl(_))
        ));
    }

    #[test]
    fn error_bodies_are_decoded_when_json() {
        let reply: ActionReply =
            decode_body(StatusCode::BAD_REQUEST, br#"{"success": false, "error": "kaputt"}"#).unwrap();
        assert_eq!(reply.into_result().unwrap_err().to_string(), "kaputt");

        let err = decode_body::<ActionReply>(StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, .. }));
    }

    #[test]
    fn user_message_prefixes_transport_errors_only() {
        assert_eq!(ApiError::Rejected("nein".into()).user_message("Fehler"), "nein");
        assert_eq!(
            ApiError::MissingField("offers").user_message("Fehler beim Laden"),
            "Fehler beim Laden: response without `offers`"
        );
    }
}
