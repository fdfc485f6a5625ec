use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use super::client::{ClientServer, FetchError, FetchSpec, HttpMethod, records_from_json};
use crate::engine::types::Record;
use crate::shared::config::FetchConfig;

/// Plain-HTTP fetcher backed by a pooled hyper client
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &FetchConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);

        let client: Client<HttpConnector, Full<Bytes>> = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build(connector);

        Self {
            client,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn build_request(spec: &FetchSpec) -> Result<Request<Full<Bytes>>, FetchError> {
        let uri = spec
            .url
            .parse::<hyper::Uri>()
            .map_err(|_| FetchError::InvalidUrl(spec.url.clone()))?;

        let method = match spec.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
        };

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Accept", "application/json");

        if let Some(headers) = &spec.headers {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let body = match &spec.body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Full::new(Bytes::from(json.to_string()))
            }
            None => Full::new(Bytes::new()),
        };

        builder
            .body(body)
            .map_err(|e| FetchError::Request(e.to_string()))
    }
}

#[async_trait]
impl ClientServer for HttpClient {
    async fn fetch(&self, spec: &FetchSpec) -> Result<Vec<Record>, FetchError> {
        let req = Self::build_request(spec)?;
        debug!(method = %spec.method, url = %spec.url, "fetching telemetry");

        let res = tokio::time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .into_body()
            .collect()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            warn!(url = %spec.url, status = status.as_u16(), "fetch failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let json: serde_json::Value = serde_json::from_slice(&body)?;
        let records = records_from_json(json)?;
        debug!(url = %spec.url, records = records.len(), "fetched telemetry");
        Ok(records)
    }
}
