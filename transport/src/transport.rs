use crate::error::TransportError;
use crate::request::Request;
use crate::request::Response;
use async_trait::async_trait;
use http::HeaderMap;
use std::collections::HashMap;
use tracing::Level;
use tracing::enabled;
use tracing::trace;

/// Response headers worth echoing into logs when correlating with the server.
const CORRELATION_HEADERS: [&str; 2] = ["x-request-id", "x-correlation-id"];

/// The single seam between the client helpers and the network.
///
/// Both the telemetry pipeline and the submission queue only ever call
/// [`HttpTransport::execute`]; a non-success HTTP status is reported as
/// [`TransportError::Http`] so callers need a single failure branch.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, req: Request) -> Result<Response, TransportError>;
}

#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, req: Request) -> reqwest::RequestBuilder {
        let Request {
            method,
            url,
            headers,
            body,
            timeout,
        } = req;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        builder
    }

    fn map_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

fn correlation_ids(headers: &HeaderMap) -> HashMap<&'static str, String> {
    CORRELATION_HEADERS
        .iter()
        .filter_map(|&name| Some((name, headers.get(name)?.to_str().ok()?.to_owned())))
        .collect()
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, req: Request) -> Result<Response, TransportError> {
        if enabled!(Level::TRACE) {
            trace!(
                "{} to {}: {}",
                req.method,
                req.url,
                req.body.as_ref().unwrap_or_default()
            );
        }

        let method = req.method.clone();
        let url = req.url.clone();
        let resp = match self.build(req).send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(%method, %url, error = %err, "Request failed");
                return Err(Self::map_error(err));
            }
        };
        let status = resp.status();
        let headers = resp.headers().clone();
        tracing::debug!(
            %method,
            %url,
            %status,
            request_ids = ?correlation_ids(&headers),
            "Request completed"
        );

        let bytes = resp.bytes().await.map_err(Self::map_error)?;
        if !status.is_success() {
            let body = String::from_utf8(bytes.to_vec()).ok();
            return Err(TransportError::Http {
                status,
                url: Some(url),
                headers: Some(headers),
                body,
            });
        }
        Ok(Response {
            status,
            headers,
            body: bytes,
        })
    }
}
