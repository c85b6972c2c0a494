// API client module: the request payload for the image-edit endpoint and
// a small blocking HTTP client that sends it. One POST for the edit, and
// an optional GET when the service answers with an image URL.

use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::{EditError, Result};

pub const MODEL: &str = "qwen-image-edit";

/// Body of the generation call. Built once per run and logged verbatim
/// before it is sent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub model: String,
    pub input: EditInput,
    pub parameters: EditParameters,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditInput {
    pub messages: Vec<Message>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// One entry of a message's content: `{"image": ...}` or `{"text": ...}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ContentPart {
    Image { image: String },
    Text { text: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditParameters {
    pub negative_prompt: String,
    pub watermark: bool,
}

impl EditRequest {
    /// A single user turn carrying the image first, then the prompt.
    pub fn new(image: impl Into<String>, prompt: impl Into<String>) -> Self {
        EditRequest {
            model: MODEL.to_string(),
            input: EditInput {
                messages: vec![Message {
                    role: "user".to_string(),
                    content: vec![
                        ContentPart::Image {
                            image: image.into(),
                        },
                        ContentPart::Text {
                            text: prompt.into(),
                        },
                    ],
                }],
            },
            parameters: EditParameters {
                negative_prompt: String::new(),
                watermark: false,
            },
        }
    }
}

/// What came back from the generation endpoint, success or not.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// The parsed body. A body that is not JSON is kept as a JSON string.
    pub body: Value,
}

/// Blocking client bound to one endpoint and one bearer token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
    generation_timeout: Duration,
    download_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().build().map_err(EditError::Request)?;
        Ok(ApiClient {
            client,
            base_url: config.base_url.clone(),
            token: config.api_key.clone(),
            generation_timeout: config.generation_timeout,
            download_timeout: config.download_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authorization and content-type headers for the generation call. A
    /// token that is not a valid header value is sent without the
    /// `Authorization` header and left for the server to reject.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match HeaderValue::from_str(&format!("Bearer {}", self.token)) {
            Ok(mut val) => {
                val.set_sensitive(true);
                headers.insert(AUTHORIZATION, val);
            }
            Err(_) => log::warn!("API key contains characters not allowed in a header"),
        }
        headers
    }

    /// POST the edit request once. Any HTTP response, including error
    /// statuses, comes back as `Ok`; only a failure without a response
    /// (connect error, timeout) is an `Err`.
    pub fn generate(&self, req: &EditRequest) -> Result<ApiResponse> {
        let res = self
            .client
            .post(&self.base_url)
            .headers(self.auth_headers())
            .json(req)
            .timeout(self.generation_timeout)
            .send()
            .map_err(EditError::Request)?;

        let status = res.status();
        let txt = res.text().map_err(EditError::Request)?;
        debug!("generation response: HTTP {} ({} bytes)", status, txt.len());
        let body = serde_json::from_str(&txt).unwrap_or(Value::String(txt));
        Ok(ApiResponse { status, body })
    }

    /// Start a GET for a generated image. The returned response is read
    /// by the caller so the body streams to disk.
    pub fn download(&self, url: &str) -> Result<Response> {
        let download_err = |source| EditError::Download {
            url: url.to_string(),
            source,
        };
        self.client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .and_then(Response::error_for_status)
            .map_err(download_err)
    }
}
