//! Generic HTTP backend.
//!
//! Sends the image as a multipart form field to an arbitrary endpoint and
//! pulls the URL out of the JSON answer with a dot path such as
//! `data.url` or `files.0.src`.

use super::{HostError, ImageHost};
use reqwest::Method;
use reqwest::blocking::{Client, multipart};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomConfig {
    pub upload_url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_file_field")]
    pub file_field: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_url_path")]
    pub response_url_path: String,
    /// Extra text fields sent alongside the file.
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_file_field() -> String {
    "file".to_string()
}

fn default_url_path() -> String {
    "url".to_string()
}

pub struct CustomHost {
    config: CustomConfig,
    method: Method,
    client: Client,
}

impl CustomHost {
    pub fn new(config: &CustomConfig) -> Result<Self, HostError> {
        let invalid = |message: String| HostError::Config {
            host: "custom",
            message,
        };
        if config.upload_url.trim().is_empty() {
            return Err(invalid("upload_url is required".into()));
        }
        let method = match config.method.to_ascii_uppercase().as_str() {
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            other => return Err(invalid(format!("unsupported method '{other}'"))),
        };
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| invalid(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            config: config.clone(),
            method,
            client,
        })
    }

    fn failed(message: impl Into<String>) -> HostError {
        HostError::Failed {
            host: "custom",
            message: message.into(),
        }
    }
}

impl ImageHost for CustomHost {
    fn name(&self) -> &str {
        "custom"
    }

    fn upload(&self, path: &Path) -> Result<String, HostError> {
        if !path.is_file() {
            return Err(HostError::NotFound(path.to_path_buf()));
        }
        let mut form = multipart::Form::new().file(self.config.file_field.clone(), path)?;
        for (k, v) in &self.config.extra_data {
            form = form.text(k.clone(), v.clone());
        }

        let mut request = self
            .client
            .request(self.method.clone(), &self.config.upload_url)
            .multipart(form);
        for (k, v) in &self.config.headers {
            request = request.header(k.as_str(), v.as_str());
        }

        let response = request.send().map_err(|e| Self::failed(e.to_string()))?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        if status.as_u16() != 200 && status.as_u16() != 201 {
            return Err(Self::failed(format!("HTTP {status}: {body}")));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| Self::failed(format!("response is not JSON: {e}")))?;
        extract_url(&json, &self.config.response_url_path)
    }
}

/// Follow a dot path through objects (by key) and arrays (by index).
pub fn extract_url(json: &Value, path: &str) -> Result<String, HostError> {
    let mut current = json;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| {
            CustomHost::failed(format!("response has no '{path}' (missing '{segment}')"))
        })?;
    }
    match current {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Null => Err(CustomHost::failed(format!("'{path}' is null"))),
        Value::String(_) => Err(CustomHost::failed(format!("'{path}' is empty"))),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> CustomConfig {
        CustomConfig {
            upload_url: "https://api.example.com/upload".into(),
            method: default_method(),
            file_field: default_file_field(),
            headers: BTreeMap::new(),
            response_url_path: default_url_path(),
            extra_data: BTreeMap::new(),
        }
    }

    #[test]
    fn extract_top_level_key() {
        let v = json!({"url": "https://img/x.png"});
        assert_eq!(extract_url(&v, "url").unwrap(), "https://img/x.png");
    }

    #[test]
    fn extract_nested_with_index() {
        let v = json!({"data": {"files": [{"src": "a"}, {"src": "b"}]}});
        assert_eq!(extract_url(&v, "data.files.1.src").unwrap(), "b");
    }

    #[test]
    fn extract_missing_key_errors() {
        let v = json!({"data": {}});
        let err = extract_url(&v, "data.url").unwrap_err().to_string();
        assert!(err.contains("data.url"), "{err}");
    }

    #[test]
    fn extract_out_of_range_index_errors() {
        let v = json!({"files": ["a"]});
        assert!(extract_url(&v, "files.3").is_err());
    }

    #[test]
    fn extract_null_errors() {
        let v = json!({"url": null});
        assert!(extract_url(&v, "url").is_err());
    }

    #[test]
    fn new_rejects_unknown_method() {
        let mut c = config();
        c.method = "DELETE".into();
        assert!(matches!(CustomHost::new(&c), Err(HostError::Config { .. })));
    }

    #[test]
    fn new_requires_upload_url() {
        let mut c = config();
        c.upload_url = String::new();
        assert!(CustomHost::new(&c).is_err());
    }

    #[test]
    fn missing_file_is_not_found() {
        let host = CustomHost::new(&config()).unwrap();
        let err = host.upload(Path::new("/definitely/missing.png")).unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }
}
