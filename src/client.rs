use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::timeout;
use url::Url;

use crate::config::mask_credential;
use crate::cookie::CookieJar;
use crate::endpoint::{do_free_vps_extend_url, free_vps_extend_url, renewal_form_body};
use crate::error::{NO_ERROR_MESSAGE, RenewError, Result, body_excerpt};
use crate::headers::HeaderSet;
use crate::html;
use crate::ids::{UniqueId, VpsId};
use crate::transport::{Method, OutboundRequest, Transport, TransportResponse, WreqTransport};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Configuration for XServerClient
#[derive(Clone)]
pub struct ClientOptions {
    pub session_id: String,
    pub device_key: String,
    /// Browser headers sent on every request
    pub headers: HeaderSet,
    /// Applied to each request separately
    pub timeout: Duration,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("session_id", &mask_credential(&self.session_id))
            .field("device_key", &mask_credential(&self.device_key))
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            device_key: String::new(),
            headers: HeaderSet::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Scripted client for the XServer control panel's free VPS renewal form.
pub struct XServerClient<T = WreqTransport> {
    transport: T,
    cookies: Mutex<CookieJar>,
    headers: HeaderSet,
    timeout: Duration,
}

impl XServerClient<WreqTransport> {
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::with_transport(options, WreqTransport::new()?)
    }
}

impl<T: Transport> XServerClient<T> {
    pub fn with_transport(options: ClientOptions, transport: T) -> Result<Self> {
        if options.session_id.is_empty() || options.device_key.is_empty() {
            return Err(RenewError::Config(
                "session id and device key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            transport,
            cookies: Mutex::new(CookieJar::for_session(
                &options.session_id,
                &options.device_key,
            )),
            headers: options.headers,
            timeout: options.timeout,
        })
    }

    /// Fetch the renewal form for `vps_id` and scrape its single-use token.
    pub async fn fetch_unique_id(&self, vps_id: &VpsId) -> Result<UniqueId> {
        tracing::info!(%vps_id, "Retrieving CSRF token for VPS");

        let request = self.build_request(Method::Get, free_vps_extend_url(vps_id), None);
        tracing::debug!(url = %request.url, "Sending request to get CSRF token");

        let response = check_status(self.execute(request).await?)?;

        tracing::debug!("Parsing response to find unique ID");
        let unique_id = html::find_unique_id(&response.body)?;
        tracing::debug!(%unique_id, %vps_id, "Unique ID found");
        Ok(unique_id)
    }

    /// Submit the renewal form.
    ///
    /// Succeeds only when the response page carries the completion phrase;
    /// any other 200 page is a failure described by its main content text.
    pub async fn extend_free_vps(&self, vps_id: &VpsId, unique_id: &UniqueId) -> Result<()> {
        tracing::info!(%vps_id, %unique_id, "Extending free VPS expiration");

        let body = renewal_form_body(vps_id, unique_id);
        let request = self.build_request(Method::Post, do_free_vps_extend_url(), Some(body));
        tracing::debug!(url = %request.url, form = ?request.body, "Sending request to extend VPS expiration");

        let response = check_status(self.execute(request).await?)?;

        if html::contains_success_phrase(&response.body) {
            tracing::info!(%vps_id, %unique_id, "VPS expiration extended successfully");
            return Ok(());
        }

        let detail = match html::find_error_message(&response.body) {
            Some(message) => message,
            None => {
                tracing::error!(%vps_id, %unique_id, "Failed to find error message in response");
                NO_ERROR_MESSAGE.to_string()
            }
        };
        tracing::error!(%vps_id, %unique_id, error_message = %detail, "VPS renewal failed");
        Err(RenewError::RenewalFailed(detail))
    }

    /// Fetch a fresh token and spend it on one renewal.
    pub async fn renew(&self, vps_id: &VpsId) -> Result<UniqueId> {
        let unique_id = self.fetch_unique_id(vps_id).await?;
        self.extend_free_vps(vps_id, &unique_id).await?;
        Ok(unique_id)
    }

    fn build_request(&self, method: Method, url: Url, body: Option<String>) -> OutboundRequest {
        let cookie = self.jar().header_value(&url);
        let content_type = body.as_ref().map(|_| FORM_CONTENT_TYPE);

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .filter(|(name, _)| {
                !(cookie.is_some() && name.eq_ignore_ascii_case("cookie"))
                    && !(content_type.is_some() && name.eq_ignore_ascii_case("content-type"))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if let Some(cookie) = cookie {
            headers.push(("Cookie".to_string(), cookie));
        }
        if let Some(content_type) = content_type {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }

        OutboundRequest {
            method,
            url,
            headers,
            body,
        }
    }

    /// Send with the per-call timeout, then fold any `Set-Cookie` headers
    /// into the jar whatever the status.
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse> {
        let url = request.url.clone();
        let response = match timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => result.inspect_err(|e| {
                tracing::error!(%url, error = %e, "Error making request");
            })?,
            Err(_) => {
                tracing::error!(%url, timeout = ?self.timeout, "Request timed out");
                return Err(RenewError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        self.store_cookies(&url, &response.set_cookies);
        Ok(response)
    }

    fn store_cookies(&self, url: &Url, set_cookies: &[String]) {
        if set_cookies.is_empty() {
            return;
        }
        let mut jar = self.jar();
        for set_cookie in set_cookies {
            match jar.store(url, set_cookie) {
                Some(name) => tracing::debug!(%name, "Cookie updated from response"),
                None => tracing::debug!("Ignoring unusable Set-Cookie header"),
            }
        }
    }

    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_status(response: TransportResponse) -> Result<TransportResponse> {
    if response.status == 200 {
        return Ok(response);
    }
    tracing::error!(
        status = response.status,
        body = %body_excerpt(&response.body),
        "Unexpected response status"
    );
    Err(RenewError::UnexpectedStatus {
        status: response.status,
        body: response.body,
    })
}
