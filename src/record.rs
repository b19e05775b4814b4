//! What the diagnostic server learns about a caller.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, Uri, header};
use chrono::{DateTime, Local};
use serde::Serialize;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize)]
pub struct UserAgentRecord {
    pub user_agent: String,
    /// First value of each header, keyed by canonical (`Title-Case`) name
    pub headers: BTreeMap<String, String>,
    pub remote_addr: String,
    pub timestamp: DateTime<Local>,
    pub method: String,
    pub request_uri: String,
}

impl UserAgentRecord {
    pub fn from_request(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        remote_addr: SocketAddr,
    ) -> Self {
        let user_agent = headers
            .get(header::USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();

        let headers = headers
            .keys()
            .filter_map(|name| {
                let value = headers.get(name)?;
                Some((
                    canonical_header_name(name.as_str()),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                ))
            })
            .collect();

        let request_uri = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            user_agent,
            headers,
            remote_addr: remote_addr.to_string(),
            timestamp: Local::now(),
            method: method.to_string(),
            request_uri,
        }
    }

    /// `Name: value` per line, in name order.
    pub fn formatted_headers(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\n"))
            .collect()
    }
}

/// One log line per request.
impl fmt::Display for UserAgentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} - UA: {} - From: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.method,
            self.request_uri,
            self.user_agent,
            self.remote_addr
        )
    }
}

/// `user-agent` -> `User-Agent`, `x-forwarded-for` -> `X-Forwarded-For`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    format!("{}{}", first.to_ascii_uppercase(), chars.as_str().to_ascii_lowercase())
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}
