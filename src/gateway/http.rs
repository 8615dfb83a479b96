use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::Gateway;
use crate::error::{CardError, Result};

/// [`Gateway`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Value> {
        debug!("{} {}{}", method, self.base_url, path);

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            debug!("{} {} -> {}: {}", method, path, status, text);
            return Err(CardError::backend(status.as_u16(), text));
        }

        decode_body(&text)
    }
}

/// An empty success body is JSON `null`; anything else must be valid JSON.
pub(crate) fn decode_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get(&self, path: &str) -> Result<Value> {
        let request = self.request(Method::GET, path);
        self.send(Method::GET, path, request).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        let request = self
            .request(Method::POST, path)
            .header(CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };
        self.send(Method::POST, path, request).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value> {
        let request = self.request(Method::PUT, path).json(&body);
        self.send(Method::PUT, path, request).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        let request = self.request(Method::DELETE, path);
        self.send(Method::DELETE, path, request).await
    }
}
