//! Thin HTTP client for a running ops server.

use anyhow::{Context, Result, bail};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use clawkeeper_config::ServerConfig;

pub struct OpsClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl OpsClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.send(self.request(Method::POST, path).query(query)).await
    }

    /// Print the JSON body, then fail on a non-success status.
    async fn send(&self, req: RequestBuilder) -> Result<Value> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("Clawkeeper is not reachable at {}", self.base_url))?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("Unexpected response body (HTTP {status})"))?;

        println!("{}", serde_json::to_string_pretty(&body)?);
        if !status.is_success() {
            bail!("Request failed with HTTP {status}");
        }
        Ok(body)
    }
}

/// Local URL of the server described by `server`.
pub fn default_base_url(server: &ServerConfig) -> String {
    let host = match server.bind.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{}:{}", host, server.port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_bind_maps_to_loopback() {
        let server = ServerConfig::default();
        assert_eq!(default_base_url(&server), "http://127.0.0.1:8787");

        let server = ServerConfig {
            bind: "10.0.0.5".into(),
            port: 9000,
            access_token: None,
        };
        assert_eq!(default_base_url(&server), "http://10.0.0.5:9000");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OpsClient::new("http://localhost:8787/", None);
        assert_eq!(client.base_url, "http://localhost:8787");
    }
}
