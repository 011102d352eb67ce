//! HTTP client for the remote content store.
//!
//! Implements [`ContentStore`] and [`AssetUploader`] over blocking `reqwest`.
//! Endpoints, relative to `host:port`:
//!
//! | Call                | Request                                          |
//! |---------------------|--------------------------------------------------|
//! | token               | `POST /token` `{clientId, secret}`               |
//! | publish schema      | `POST /{version}/{database}/{collection}/config` |
//! | create record       | `POST /{version}/{database}/{collection}`        |
//! | upload asset        | `POST {media_path}` multipart, field `file`      |
//!
//! Every call after the token exchange carries `Authorization: Bearer`. The
//! token is fetched once and shared by all workers; a `401` drops it so the
//! next call authenticates again. Every call is bounded by the configured
//! timeout, and an expired one surfaces as [`StoreError::Timeout`].

use crate::config::ApiConfig;
use crate::schema::CollectionConfig;
use crate::store::{AssetUploader, ContentStore, StoreError};
use crate::types::{Record, RecordRef};
use crate::walk;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    results: Vec<CreatedDocument>,
}

#[derive(Deserialize)]
struct CreatedDocument {
    #[serde(rename = "_id")]
    id: Option<String>,
}

/// Blocking client for one store database.
pub struct ApiClient {
    http: Client,
    base_url: String,
    collection_root: String,
    media_url: String,
    client_id: String,
    secret: String,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, StoreError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        let base_url = config.base_url();
        Ok(Self {
            http,
            collection_root: format!("{base_url}/{}/{}", config.version, config.database),
            media_url: format!("{base_url}{}", config.media_path),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            base_url,
            token: Mutex::new(None),
        })
    }

    pub fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.collection_root)
    }

    pub fn config_url(&self, collection: &str) -> String {
        format!("{}/{collection}/config", self.collection_root)
    }

    pub fn media_url(&self) -> &str {
        &self.media_url
    }

    /// Cached bearer token, fetched on first use.
    fn token(&self) -> Result<String, StoreError> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        tracing::debug!(url = %self.base_url, "requesting access token");
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .json(&TokenRequest {
                client_id: &self.client_id,
                secret: &self.secret,
            })
            .send()?;
        if !response.status().is_success() {
            return Err(StoreError::Auth(format!(
                "token endpoint answered {}",
                response.status()
            )));
        }
        let token = response.json::<TokenResponse>()?.access_token;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Send an authorized request and turn non-2xx answers into errors.
    fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.bearer_auth(self.token()?).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }
        Err(StoreError::Status {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }
}

impl ContentStore for ApiClient {
    fn set_config(&self, collection: &str, config: &CollectionConfig) -> Result<(), StoreError> {
        let url = self.config_url(collection);
        tracing::debug!(%url, fields = config.fields.len(), "publishing collection schema");
        self.send(self.http.post(url).json(config))?;
        Ok(())
    }

    fn create(&self, collection: &str, record: &Record) -> Result<Vec<RecordRef>, StoreError> {
        let url = self.collection_url(collection);
        tracing::debug!(%url, "creating record");
        let response: ResultsResponse = self.send(self.http.post(url).json(record))?.json()?;
        let refs: Vec<_> = response
            .results
            .into_iter()
            .filter_map(|doc| doc.id)
            .map(|id| RecordRef {
                collection: collection.to_string(),
                id,
            })
            .collect();
        if refs.is_empty() {
            return Err(StoreError::MissingId(collection.to_string()));
        }
        Ok(refs)
    }
}

impl AssetUploader for ApiClient {
    fn upload(&self, path: &Path) -> Result<String, StoreError> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime = walk::content_type(path).unwrap_or("application/octet-stream");
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = multipart::Form::new().part("file", part);

        tracing::debug!(path = %path.display(), url = %self.media_url, "uploading asset");
        let response: ResultsResponse =
            self.send(self.http.post(&self.media_url).multipart(form))?.json()?;
        response
            .results
            .into_iter()
            .find_map(|doc| doc.id)
            .ok_or_else(|| StoreError::MissingId(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn client(config: ApiConfig) -> ApiClient {
        ApiClient::new(&config).unwrap()
    }

    fn local_config(port: u16, timeout_secs: u64) -> ApiConfig {
        ApiConfig {
            host: "http://127.0.0.1".into(),
            port,
            timeout_secs,
            ..ApiConfig::default()
        }
    }

    /// A store on a local port that answers every request with `200` and
    /// `body`, one connection per request.
    fn answering_store(body: &'static str) -> ApiConfig {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut length = 0;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        length = value.trim().parse().unwrap_or(0);
                    }
                }
                let mut request_body = vec![0; length];
                reader.read_exact(&mut request_body).ok();
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .ok();
            }
        });
        local_config(port, 5)
    }

    /// A store that accepts connections and never answers.
    fn stalled_store(timeout_secs: u64) -> ApiConfig {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let _held: Vec<_> = listener.incoming().collect();
        });
        local_config(port, timeout_secs)
    }

    #[test]
    fn endpoint_urls() {
        let api = client(ApiConfig {
            host: "http://127.0.0.1/".into(),
            port: 8000,
            version: "vjoin".into(),
            database: "testdb".into(),
            ..ApiConfig::default()
        });

        assert_eq!(api.collection_url("text"), "http://127.0.0.1:8000/vjoin/testdb/text");
        assert_eq!(
            api.config_url("blogPost"),
            "http://127.0.0.1:8000/vjoin/testdb/blogPost/config"
        );
        assert_eq!(api.media_url(), "http://127.0.0.1:8000/media");
    }

    #[test]
    fn custom_media_path() {
        let api = client(ApiConfig {
            media_path: "/assets/upload".into(),
            ..ApiConfig::default()
        });
        assert_eq!(api.media_url(), "http://localhost:3000/assets/upload");
    }

    #[test]
    fn unreachable_store_is_an_error() {
        let api = client(local_config(9, 2));
        let result = api.create("text", &Record::new());
        assert!(matches!(
            result,
            Err(StoreError::Transport(_)) | Err(StoreError::Timeout)
        ));
    }

    #[test]
    fn stalled_store_times_out() {
        let api = client(stalled_store(1));
        let result = api.create("text", &Record::new());
        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[test]
    fn create_returns_ids_from_results() {
        let api = client(answering_store(
            r#"{"accessToken": "t", "results": [{"_id": "abc"}]}"#,
        ));
        let refs = api.create("text", &Record::new()).unwrap();
        assert_eq!(
            refs,
            vec![RecordRef {
                collection: "text".into(),
                id: "abc".into(),
            }]
        );
    }

    #[test]
    fn create_without_ids_is_an_error() {
        let api = client(answering_store(r#"{"accessToken": "t", "results": []}"#));
        let result = api.create("text", &Record::new());
        assert!(matches!(result, Err(StoreError::MissingId(ref c)) if c == "text"));

        let api = client(answering_store(
            r#"{"accessToken": "t", "results": [{"title": "x"}]}"#,
        ));
        let result = api.create("text", &Record::new());
        assert!(matches!(result, Err(StoreError::MissingId(_))));
    }

    #[test]
    fn missing_asset_is_io_error() {
        let api = client(ApiConfig::default());
        let result = api.upload(Path::new("/definitely/not/here.jpg"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn results_without_ids_are_skipped() {
        let parsed: ResultsResponse =
            serde_json::from_str(r#"{"results": [{"_id": "a"}, {"title": "x"}]}"#).unwrap();
        let ids: Vec<_> = parsed.results.into_iter().filter_map(|d| d.id).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn token_request_is_camel_case() {
        let json = serde_json::to_value(TokenRequest {
            client_id: "c",
            secret: "s",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"clientId": "c", "secret": "s"}));
    }
}
