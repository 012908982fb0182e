//! Telegraph page API.
//!
//! [`RemotePublisher`] is the two calls the publish session needs: create a
//! page and overwrite an existing page's content. [`TelegraphClient`] is the
//! real implementation over `https://api.telegra.ph`.
//!
//! Errors keep the service's message verbatim. Flood control replies
//! (`FLOOD_WAIT_7`, "Retry in 7 seconds") are interpreted later by
//! [`crate::retry::retry_delay_hint`], not here.

use crate::node::Node;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const API_BASE: &str = "https://api.telegra.ph";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("{0}")]
    Api(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("unexpected response: {0}")]
    Response(String),
}

/// A page as returned by the service after creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPage {
    pub path: String,
    pub url: String,
}

pub trait RemotePublisher {
    fn create_page(&self, title: &str, content: &[Node]) -> Result<CreatedPage, RemoteError>;

    fn edit_page(&self, path: &str, title: &str, content: &[Node]) -> Result<(), RemoteError>;
}

impl<T: RemotePublisher + ?Sized> RemotePublisher for &T {
    fn create_page(&self, title: &str, content: &[Node]) -> Result<CreatedPage, RemoteError> {
        (**self).create_page(title, content)
    }

    fn edit_page(&self, path: &str, title: &str, content: &[Node]) -> Result<(), RemoteError> {
        (**self).edit_page(path, title, content)
    }
}

/// `{"ok": true, "result": ...}` or `{"ok": false, "error": "..."}`.
#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> Result<T, RemoteError> {
        if !self.ok {
            return Err(RemoteError::Api(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        self.result
            .ok_or_else(|| RemoteError::Response("missing result".to_string()))
    }
}

pub struct TelegraphClient {
    http: Client,
    base_url: String,
    access_token: String,
    author_name: Option<String>,
}

impl TelegraphClient {
    pub fn new(access_token: &str, author_name: Option<&str>) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: API_BASE.to_string(),
            access_token: access_token.to_string(),
            author_name: author_name.map(str::to_string),
        })
    }

    /// Point the client at another API root (a proxy or a test server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn form(&self, title: &str, content: &[Node]) -> Result<Vec<(&'static str, String)>, RemoteError> {
        let content =
            serde_json::to_string(content).map_err(|e| RemoteError::Response(e.to_string()))?;
        let mut form = vec![
            ("access_token", self.access_token.clone()),
            ("title", title.to_string()),
            ("content", content),
        ];
        if let Some(author) = &self.author_name {
            form.push(("author_name", author.clone()));
        }
        Ok(form)
    }

    fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        form: &[(&'static str, String)],
    ) -> Result<T, RemoteError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        // Telegraph reports flood control as a 200 with ok=false, but proxies
        // may answer with a bare status.
        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                RemoteError::Response(e.to_string())
            } else {
                RemoteError::Http(format!("{status}: {body}"))
            }
        })?;
        envelope.into_result()
    }
}

impl RemotePublisher for TelegraphClient {
    fn create_page(&self, title: &str, content: &[Node]) -> Result<CreatedPage, RemoteError> {
        let form = self.form(title, content)?;
        self.call("createPage", &form)
    }

    fn edit_page(&self, path: &str, title: &str, content: &[Node]) -> Result<(), RemoteError> {
        let form = self.form(title, content)?;
        let _: serde_json::Value = self.call(&format!("editPage/{path}"), &form)?;
        Ok(())
    }
}
