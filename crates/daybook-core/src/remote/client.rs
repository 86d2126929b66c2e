//! HTTP client for the self-hosted sync API

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info};

use crate::models::{Dataset, Entity, SiteSettings};
use crate::remote::error::RemoteError;
use crate::remote::wire;

/// Longest error body kept in [`RemoteError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Authenticated client for one endpoint
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteStore {
    /// Build a client; performs no network I/O
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let endpoint = parse_endpoint(endpoint)?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| RemoteError::InvalidKey(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unreachable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Authenticated reachability check; mutates nothing on either side
    pub async fn connect(&self) -> Result<(), RemoteError> {
        let url = self.url(&["settings"])?;
        debug!("Probing {}", url);
        self.send(self.client.get(url)).await?;
        info!("Connected to {}", self.endpoint);
        Ok(())
    }

    /// Fetch the entire dataset in one request
    pub async fn fetch_all(&self) -> Result<Dataset, RemoteError> {
        let url = self.url(&["data"])?;
        debug!("Fetching dataset from {}", url);
        let response = self.send(self.client.get(url)).await?;
        let body: Value = response.json().await.map_err(RemoteError::from_transport)?;
        let dataset = wire::decode_dataset(body)?;
        info!(
            "Fetched dataset: {} notes, {} recordings, {} photos",
            dataset.notes.len(),
            dataset.recordings.len(),
            dataset.photos.len()
        );
        Ok(dataset)
    }

    /// Create or replace one record
    pub async fn save<T: Entity>(&self, record: &T) -> Result<(), RemoteError> {
        let url = self.url(&[T::KIND.collection(), record.id()])?;
        let body = wire::encode_record(record)
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;
        debug!("PUT {}", url);
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    /// Delete one record; a missing record is not an error
    pub async fn delete<T: Entity>(&self, id: &str) -> Result<(), RemoteError> {
        let url = self.url(&[T::KIND.collection(), id])?;
        debug!("DELETE {}", url);
        match self.send(self.client.delete(url)).await {
            Err(RemoteError::Status { code: 404, .. }) => Ok(()),
            other => other.map(|_| ()),
        }
    }

    pub async fn save_settings(&self, settings: &SiteSettings) -> Result<(), RemoteError> {
        let url = self.url(&["settings"])?;
        let body = wire::encode_settings(settings)
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(RemoteError::from_transport)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized);
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(RemoteError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, RemoteError> {
    let url = Url::parse(endpoint.trim())
        .map_err(|_| RemoteError::InvalidEndpoint(endpoint.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(RemoteError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Note, Recording};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_store(base_url: &str) -> RemoteStore {
        RemoteStore::new(base_url, "test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = RemoteStore::new("not a url", "k", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidEndpoint(_)));

        let err = RemoteStore::new("ftp://host", "k", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_url_building() {
        let store = test_store("https://sync.example.com/base/");
        let url = store.url(&["notes", "n1"]).unwrap();
        assert_eq!(url.as_str(), "https://sync.example.com/base/api/notes/n1");
    }

    #[tokio::test]
    async fn test_connect_sends_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        test_store(&server.uri()).connect().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = test_store(&server.uri()).connect().await.unwrap_err();
        assert!(matches!(err, RemoteError::Unauthorized));
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        let err = test_store("http://127.0.0.1:1").connect().await.unwrap_err();
        assert!(matches!(err, RemoteError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_fetch_all_decodes_blobs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "settings": {"siteName": "Server"},
                "recordings": [{
                    "id": "r1",
                    "name": "memo",
                    "date": "2024-05-01T10:00:00Z",
                    "audioBase64": "AQID"
                }]
            })))
            .mount(&server)
            .await;

        let dataset = test_store(&server.uri()).fetch_all().await.unwrap();
        assert_eq!(dataset.settings.site_name, "Server");
        assert_eq!(dataset.recordings.len(), 1);
        assert_eq!(dataset.recordings[0].audio, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_all_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = test_store(&server.uri()).fetch_all().await.unwrap_err();
        assert!(matches!(err, RemoteError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_all_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = test_store(&server.uri()).fetch_all().await.unwrap_err();
        match err {
            RemoteError::Status { code, body } => {
                assert_eq!(code, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_puts_record() {
        let server = MockServer::start().await;
        let recording = Recording::new("memo", vec![1, 2, 3]);
        Mock::given(method("PUT"))
            .and(path(format!("/api/recordings/{}", recording.id)))
            .and(body_partial_json(json!({"name": "memo", "audioBase64": "AQID"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        test_store(&server.uri()).save(&recording).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/notes/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        test_store(&server.uri()).delete::<Note>("gone").await.unwrap();
    }
}
