//! The HTTP seam between the renewal client and the network.
//!
//! [`XServerClient`](crate::client::XServerClient) only builds requests and
//! interprets responses; sending them goes through [`Transport`], so tests
//! can plug in a scripted transport instead of the real one.

use std::future::Future;

use url::Url;
use wreq::{Client, header};
use wreq_util::Emulation;

use crate::error::{RenewError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully assembled request: headers already include cookies and
/// content type.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Raw `Set-Cookie` header values, in the order received.
    pub set_cookies: Vec<String>,
    pub body: String,
}

pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;
}

/// `wreq` client with a Chrome TLS/HTTP2 fingerprint.
pub struct WreqTransport {
    client: Client,
}

impl WreqTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .emulation(Emulation::Chrome143)
            .gzip(true)
            .brotli(true)
            .zstd(true)
            .build()
            .map_err(|e| RenewError::Network {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }
}

impl Transport for WreqTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse> {
        let url = request.url.to_string();
        let network_error = |e: wreq::Error| RenewError::Network {
            url: url.clone(),
            message: e.to_string(),
        };

        let mut builder = match request.method {
            Method::Get => self.client.get(url.as_str()),
            Method::Post => self.client.post(url.as_str()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect();
        let body = response.text().await.map_err(network_error)?;

        Ok(TransportResponse {
            status,
            set_cookies,
            body,
        })
    }
}
