//! HTTP transport for server communication.
//!
//! [`HttpTransport`] performs one HTTP verb against a fully built URL with
//! an optional JSON body and an optional authorization header, and maps the
//! response onto the crate's error taxonomy: 2xx parses the body (or yields
//! nothing for an empty body), 404 becomes [`Error::NotFound`], any other
//! status becomes [`Error::OperationOutcome`] carrying the raw body.
//! Transport-level failures pass through as [`Error::Network`]; no retries,
//! no timeouts beyond the underlying client's defaults.

use crate::error::{Error, Result};

/// The HTTP verbs the protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Lowercase verb name, for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Thin wrapper over a shared reqwest client.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Creates the transport.
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created, which
    /// should only happen in extremely unusual circumstances (e.g., TLS
    /// initialization failure).
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .expect("Failed to create HTTP client");
        Self { http }
    }

    /// Performs `method` against `url` and returns the parsed JSON body, or
    /// `None` for an empty 2xx response.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&serde_json::Value>,
        authorization: Option<&str>,
    ) -> Result<Option<serde_json::Value>> {
        let mut builder = self
            .http
            .request(method.into(), url)
            .header("Accept", "application/json");
        if let Some(token) = authorization {
            builder = builder.header("Authorization", token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        tracing::debug!(method = method.as_str(), url, "sending request");
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            if text.is_empty() {
                return Ok(None);
            }
            let parsed = serde_json::from_str(&text).map_err(|e| {
                Error::invalid_response("a JSON body", format!("an unparseable body ({e})"))
            })?;
            return Ok(Some(parsed));
        }

        if status == 404 {
            return Err(Error::NotFound(text));
        }
        Err(Error::OperationOutcome { status, body: text })
    }
}
