use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use tracing::{debug, warn};

use crate::config::ApiKey;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::provider::{ChunkStream, CompletionProvider};
use crate::sse::process_sse;
use crate::types::{ChatCompletionRequest, ErrorResponse};

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/";

/// Client for the Groq chat-completion API.
///
/// No request timeout is set unless one is given to [`Groq::with_options`];
/// a streamed reply may take as long as the provider keeps the connection open.
#[derive(Debug, Clone)]
pub struct Groq {
    api_key: ApiKey,
    client: ReqwestClient,
    base_url: String,
    timeout: Option<Duration>,
}

impl Groq {
    /// Create a new Groq client.
    pub fn new(api_key: ApiKey) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// The base URL must be absolute; a trailing slash is added if missing.
    pub fn with_options(
        api_key: ApiKey,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        if api_key.expose().trim().is_empty() {
            return Err(Error::authentication("API key is empty"));
        }
        // Reject keys that cannot be sent as a header now rather than per request.
        HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
            .map_err(|_| Error::authentication("API key contains invalid characters"))?;

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        url::Url::parse(&base_url)?;

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose()))
            .map_err(|_| Error::authentication("API key contains invalid characters"))?;
        authorization.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, authorization);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.trim().parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .map(|response| response.error);
        let error_type = parsed
            .as_ref()
            .and_then(|e| e.error_type.clone().or_else(|| e.code.clone()));
        let error_param = parsed.as_ref().and_then(|e| e.param.clone());
        let error_message = parsed
            .and_then(|e| e.message)
            .unwrap_or(error_body);

        match status_code {
            400 | 422 => Error::bad_request(error_message, error_param),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(Some(status_code), error_type, error_message, request_id),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            let limit = self
                .timeout
                .map(|t| format!(" after {}s", t.as_secs_f64()))
                .unwrap_or_default();
            Error::timeout(format!("Request timed out{limit}: {e}"))
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Send a chat-completion request and get a streaming response.
    ///
    /// Streaming is forced on regardless of the request's `stream` flag.
    pub async fn stream(&self, mut request: ChatCompletionRequest) -> Result<ChunkStream> {
        request.stream = true;
        let url = format!("{}chat/completions", self.base_url);
        let started = Instant::now();
        CLIENT_REQUESTS.click();
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "opening chat completion stream"
        );

        let response = self
            .client
            .post(&url)
            .headers(self.default_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?;
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            warn!(error = %err, "chat completion request failed");
            return Err(err);
        }

        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

#[async_trait::async_trait]
impl CompletionProvider for Groq {
    async fn stream_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
        self.stream(request).await
    }
}
