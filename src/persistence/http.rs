//! Area store backed by the dashboard's HTTP backend.
//!
//! `POST {base}/api/save-area` takes `{ "videos": {...}, "areas": [...] }` and
//! answers with a bare success status. `GET {base}/api/load-area` returns the
//! stored areas array, or 404 when nothing has been saved.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::{AreaStore, LoadError, PersistError, SavePayload};

mod endpoints {
    pub const SAVE_AREA: &str = "/api/save-area";
    pub const LOAD_AREA: &str = "/api/load-area";
}

#[derive(Clone)]
pub struct HttpAreaStore {
    http: Client,
    base_url: String,
}

impl HttpAreaStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client for area store")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AreaStore for HttpAreaStore {
    async fn put(&self, payload: &SavePayload) -> Result<(), PersistError> {
        let response = self
            .http
            .post(self.url(endpoints::SAVE_AREA))
            .json(payload)
            .send()
            .await
            .map_err(|err| PersistError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PersistError::Rejected {
                status: status.as_u16(),
            })
        }
    }

    async fn fetch(&self) -> Result<Option<Value>, LoadError> {
        let response = self
            .http
            .get(self.url(endpoints::LOAD_AREA))
            .send()
            .await
            .map_err(|err| LoadError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LoadError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| LoadError::Transport(err.to_string()))?;
        parse_body(&body)
    }

    fn describe(&self) -> String {
        format!("area backend at {}", self.base_url)
    }
}

fn parse_body(body: &str) -> Result<Option<Value>, LoadError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(err) => Err(LoadError::malformed(
            None,
            format!("response is not valid JSON ({err})"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let store = HttpAreaStore::new("http://localhost:5000/").unwrap();
        assert_eq!(store.url(endpoints::SAVE_AREA), "http://localhost:5000/api/save-area");
    }

    #[test]
    fn empty_or_null_body_means_nothing_stored() {
        assert_eq!(parse_body("").unwrap(), None);
        assert_eq!(parse_body("null").unwrap(), None);
    }

    #[test]
    fn garbage_body_is_malformed() {
        let err = parse_body("<html>oops</html>").unwrap_err();
        assert!(matches!(err, LoadError::MalformedSchema { signal: None, .. }));
    }
}
