//! Outbound HTTP transport used by dispatch workers

use crate::error::{AttemptError, TransportError};
use crate::worker::MAX_CONCURRENT_REQUESTS;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as StdError;
use std::time::Duration;

/// Issues a single GET and reports the response status code.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, AttemptError>;
}

/// reqwest-backed transport; one client is shared by every dispatch.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_CONCURRENT_REQUESTS)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, AttemptError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;

        Ok(response.status().as_u16())
    }
}

fn classify(e: &reqwest::Error, timeout: Duration) -> AttemptError {
    if e.is_timeout() {
        AttemptError::Timeout(timeout)
    } else if e.is_connect() {
        AttemptError::Connect(describe(e))
    } else if e.is_builder() {
        AttemptError::InvalidUrl(describe(e))
    } else {
        AttemptError::Request(describe(e))
    }
}

/// reqwest's Display omits the cause (DNS, refused, TLS); append the source chain.
fn describe(e: &reqwest::Error) -> String {
    let mut description = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        description.push_str(": ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_returns_status_code() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let status = transport
            .get(&mock_server.uri(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_error_status_is_still_a_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let status = transport
            .get(&format!("{}/missing", mock_server.uri()), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(status, 503);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let timeout = Duration::from_millis(100);
        let transport = ReqwestTransport::new().unwrap();
        let result = transport.get(&mock_server.uri(), timeout).await;

        assert_eq!(result, Err(AttemptError::Timeout(timeout)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Grab a free port, then close it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = ReqwestTransport::new().unwrap();
        let result = transport
            .get(&format!("http://127.0.0.1:{}/", port), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(AttemptError::Connect(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let transport = ReqwestTransport::new().unwrap();
        let result = transport
            .get("not a url", Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(AttemptError::InvalidUrl(_))), "got {:?}", result);
    }
}
