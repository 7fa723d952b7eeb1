use crate::config::ClientConfig;
use crate::error::{is_error_payload, ApiError};
use crate::models::{
    ChatRequest, ChatResponse, HealthStatus, LessonRequest, LessonResponse, McqRequest,
    McqResponse, SearchRequest, SearchResponse,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

// Backend routes, relative to the configured base URL
pub const HEALTH_PATH: &str = "/health";
pub const SEARCH_FAQ_PATH: &str = "/search-faq";
pub const CHAT_PATH: &str = "/chat";
pub const SIMPLE_CHAT_PATH: &str = "/simple-chat";
pub const COURSE_LESSON_PATH: &str = "/generate-course-lesson";
pub const MCQ_PATH: &str = "/generate-mcq";

// Trait defining the operations the UI layer needs from the FAQ backend.
// Every method resolves to either the decoded payload or a normalized ApiError.
#[async_trait]
pub trait FaqApi: Send + Sync {
    async fn check_health(&self) -> Result<HealthStatus, ApiError>;

    async fn search_faq(&self, query: &str, max_results: u32) -> Result<SearchResponse, ApiError>;

    /// `system_prompt` falls back to the configured default when `None`.
    async fn chat(&self, message: &str, system_prompt: Option<&str>) -> Result<ChatResponse, ApiError>;

    async fn simple_chat(&self, message: &str) -> Result<ChatResponse, ApiError>;

    async fn generate_course_lesson(&self, request: &LessonRequest) -> Result<LessonResponse, ApiError>;

    async fn generate_mcq(&self, request: &McqRequest) -> Result<McqResponse, ApiError>;
}

/// Per-call options for [`HttpFaqClient::call_api`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Extra headers; these win over the default `Content-Type`.
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn post(body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            body,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

// --- HTTP implementation ---

pub struct HttpFaqClient {
    client: Client,
    config: ClientConfig,
}

impl HttpFaqClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    /// Issues a request and decodes the JSON body as `T`.
    ///
    /// Never fails any other way than through the returned [`ApiError`]; errors are also
    /// logged. A 2xx body is not validated beyond decoding, except that a body whose
    /// `status` is `"error"` is reported as [`ApiError::Backend`].
    pub async fn call_api<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T, ApiError> {
        let method = options.method.clone();
        let result = self.execute(url, options).await;
        if let Err(e) = &result {
            log::error!("API Error: {} {} failed: {}", method, url, e);
        }
        result
    }

    async fn execute<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T, ApiError> {
        let headers = build_headers(&options.headers)?;
        log::debug!("Sending {} request to {}", options.method, url);

        let mut request = self.client.request(options.method, url).headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Decode(format!("Invalid JSON in response body: {}", e)))?;
        if is_error_payload(&body) {
            return Err(ApiError::from_payload(&body));
        }
        serde_json::from_value(body)
            .map_err(|e| ApiError::Decode(format!("Unexpected response shape: {}", e)))
    }

    fn post_json<B: serde::Serialize>(body: &B) -> Result<RequestOptions, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Invalid(format!("Failed to encode request body: {}", e)))?;
        Ok(RequestOptions::post(Some(body)))
    }
}

fn build_headers(extra: &[(String, String)]) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::Invalid(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::Invalid(format!("Invalid value for header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl FaqApi for HttpFaqClient {
    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        self.call_api(&self.config.endpoint(HEALTH_PATH), RequestOptions::default())
            .await
    }

    async fn search_faq(&self, query: &str, max_results: u32) -> Result<SearchResponse, ApiError> {
        log::info!("Searching FAQ for '{}' (max {} results)", query, max_results);
        let options = Self::post_json(&SearchRequest {
            query: query.to_string(),
            max_results,
        })?;
        self.call_api(&self.config.endpoint(SEARCH_FAQ_PATH), options)
            .await
    }

    async fn chat(&self, message: &str, system_prompt: Option<&str>) -> Result<ChatResponse, ApiError> {
        let system_prompt = system_prompt
            .filter(|p| !p.is_empty())
            .unwrap_or(self.config.default_system_prompt.as_str());
        log::info!("Sending chat message ({} chars)", message.len());
        let options = Self::post_json(&ChatRequest {
            message: message.to_string(),
            system_prompt: system_prompt.to_string(),
        })?;
        self.call_api(&self.config.endpoint(CHAT_PATH), options).await
    }

    async fn simple_chat(&self, message: &str) -> Result<ChatResponse, ApiError> {
        log::info!("Sending simple chat message ({} chars)", message.len());
        let options = RequestOptions::post(None).with_query("message", message);
        self.call_api(&self.config.endpoint(SIMPLE_CHAT_PATH), options)
            .await
    }

    async fn generate_course_lesson(&self, request: &LessonRequest) -> Result<LessonResponse, ApiError> {
        if let Err(e) = request.validate() {
            log::warn!("Rejected course lesson request: {}", e);
            return Err(e);
        }
        log::info!("Generating course lesson on '{}'", request.topic);
        let options = Self::post_json(request)?;
        self.call_api(&self.config.endpoint(COURSE_LESSON_PATH), options)
            .await
    }

    async fn generate_mcq(&self, request: &McqRequest) -> Result<McqResponse, ApiError> {
        if let Err(e) = request.validate() {
            log::warn!("Rejected MCQ request: {}", e);
            return Err(e);
        }
        log::info!(
            "Generating {} MCQs on '{}'",
            request.number_of_questions,
            request.topic
        );
        let options = Self::post_json(request)?;
        self.call_api(&self.config.endpoint(MCQ_PATH), options).await
    }
}
