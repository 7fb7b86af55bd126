//! Transport to the search backend.
//!
//! The `Transport` trait is the manager's only way to reach the network.
//! It returns boxed futures so the manager can be tested with a mock and so
//! implementations stay object safe.

use std::path::Path;

use futures::future::BoxFuture;
use hicc_core::{ConfigError, RequestError};
use serde_json::Value;

// =============================================================================
// Search Request
// =============================================================================

/// One request to the search backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    /// `GET {solr_url}{servlet}?{params}&wt=json`
    Get { url: String },
    /// `POST {proxy_url}` with a single `query` form field.
    Post { url: String, query: String },
}

impl SearchRequest {
    pub fn url(&self) -> &str {
        match self {
            Self::Get { url } | Self::Post { url, .. } => url,
        }
    }

    /// The serialized parameters carried by the request.
    pub fn params(&self) -> &str {
        match self {
            Self::Get { url } => url.split_once('?').map_or("", |(_, q)| q),
            Self::Post { query, .. } => query,
        }
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Executes search requests and decodes the JSON payload.
pub trait Transport: Send + Sync {
    fn execute(&self, request: SearchRequest) -> BoxFuture<'static, Result<Value, RequestError>>;
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// Transport over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: SearchRequest) -> BoxFuture<'static, Result<Value, RequestError>> {
        let client = self.client.clone();

        Box::pin(async move {
            let builder = match &request {
                SearchRequest::Get { url } => client.get(url),
                SearchRequest::Post { url, query } => {
                    client.post(url).form(&[("query", query.as_str())])
                }
            };

            let response = builder
                .send()
                .await
                .map_err(|e| RequestError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unable to read error body".to_owned());
                return Err(RequestError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| RequestError::MalformedResponse(e.to_string()))
        })
    }
}

// =============================================================================
// Fixture Transport
// =============================================================================

/// Answers every request with the same canned payload.
///
/// Lets the dashboard run without a search backend.
pub struct FixtureTransport {
    body: Value,
}

impl FixtureTransport {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Load the payload from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let body = serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self::new(body))
    }
}

impl Transport for FixtureTransport {
    fn execute(&self, request: SearchRequest) -> BoxFuture<'static, Result<Value, RequestError>> {
        tracing::debug!("Serving fixture for {}", request.url());
        let body = self.body.clone();
        Box::pin(async move { Ok(body) })
    }
}

// =============================================================================
// Mock Transport for Testing
// =============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    type Reply = (Duration, Result<Value, RequestError>);

    /// Mock transport recording every request.
    ///
    /// Replies are served in order; once they run out, `{}` is returned.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        pub requests: Arc<Mutex<Vec<SearchRequest>>>,
        replies: Arc<Mutex<VecDeque<Reply>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful reply.
        pub fn with_reply(self, body: Value) -> Self {
            self.replies.lock().push_back((Duration::ZERO, Ok(body)));
            self
        }

        /// Queue a reply that arrives after `delay`.
        pub fn with_delayed_reply(self, delay: Duration, body: Value) -> Self {
            self.replies.lock().push_back((delay, Ok(body)));
            self
        }

        /// Queue a failure.
        pub fn with_error(self, error: RequestError) -> Self {
            self.replies.lock().push_back((Duration::ZERO, Err(error)));
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        pub fn last_request(&self) -> Option<SearchRequest> {
            self.requests.lock().last().cloned()
        }
    }

    impl Transport for MockTransport {
        fn execute(
            &self,
            request: SearchRequest,
        ) -> BoxFuture<'static, Result<Value, RequestError>> {
            self.requests.lock().push(request);
            let (delay, reply) = self
                .replies
                .lock()
                .pop_front()
                .unwrap_or((Duration::ZERO, Ok(Value::Object(Default::default()))));

            Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_request_params() {
        let get = SearchRequest::Get {
            url: "http://s/solr/select?q=a&wt=json".to_string(),
        };
        assert_eq!(get.params(), "q=a&wt=json");
        assert_eq!(get.url(), "http://s/solr/select?q=a&wt=json");

        let post = SearchRequest::Post {
            url: "http://proxy/".to_string(),
            query: "q=a".to_string(),
        };
        assert_eq!(post.params(), "q=a");
        assert_eq!(post.url(), "http://proxy/");
    }

    #[tokio::test]
    async fn test_fixture_transport() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"response": {{"numFound": 3}}}}"#).unwrap();

        let transport = FixtureTransport::from_file(file.path()).unwrap();
        let body = transport
            .execute(SearchRequest::Get {
                url: "http://s/select?wt=json".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(body, json!({"response": {"numFound": 3}}));
    }

    #[test]
    fn test_fixture_transport_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            FixtureTransport::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
