//! Cookie jar for the control panel session.
//!
//! Seeded with the `X2SESSID` and `XSERVER_DEVICEKEY` credentials and kept
//! current from every response's `Set-Cookie` headers, so a session the panel
//! rotates on the form page is the one the renewal POST carries.

use std::fmt;

use cookie::Cookie;
use url::Url;

use crate::endpoint::XSERVER_HOST;

pub const SESSION_COOKIE: &str = "X2SESSID";
pub const DEVICE_KEY_COOKIE: &str = "XSERVER_DEVICEKEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    /// No `Domain` attribute was given: only the exact host gets it back.
    pub host_only: bool,
}

impl SessionCookie {
    /// Cookie scoped to the panel host, root path, secure-only.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: XSERVER_HOST.to_string(),
            path: "/".to_string(),
            secure: true,
            host_only: false,
        }
    }

    /// Whether a request to `url` should carry this cookie.
    pub fn matches(&self, url: &Url) -> bool {
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host_matches = if self.host_only {
            host.eq_ignore_ascii_case(&self.domain)
        } else {
            domain_matches(host, &self.domain)
        };
        host_matches && path_matches(url.path(), &self.path)
    }

    fn same_slot(&self, other: &SessionCookie) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.domain.eq_ignore_ascii_case(&other.domain)
    }
}

/// `Set-Cookie` form; a nameless cookie renders as nothing.
impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return Ok(());
        }
        write!(f, "{}={}", self.name, self.value)?;
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        if !self.domain.is_empty() {
            write!(f, "; Domain={}", self.domain)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain
        || host
            .strip_suffix(&domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Directory of the request path, used when `Set-Cookie` names no `Path`.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(end) => request_path[..end].to_string(),
    }
}

fn is_expired(cookie: &Cookie<'_>) -> bool {
    if let Some(max_age) = cookie.max_age() {
        return max_age.is_zero() || max_age.is_negative();
    }
    cookie
        .expires_datetime()
        .is_some_and(|expires| expires.unix_timestamp() <= chrono::Utc::now().timestamp())
}

#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<SessionCookie>,
}

impl CookieJar {
    /// Jar holding the `X2SESSID` and `XSERVER_DEVICEKEY` credentials.
    pub fn for_session(session_id: &str, device_key: &str) -> Self {
        let mut jar = Self::default();
        for cookie in [
            SessionCookie::new(SESSION_COOKIE, session_id),
            SessionCookie::new(DEVICE_KEY_COOKIE, device_key),
        ] {
            jar.store_from(XSERVER_HOST, "/", &cookie.to_string());
        }
        jar
    }

    /// Apply one `Set-Cookie` header received in a response from `url`.
    ///
    /// Returns the cookie name when the header replaced, added or expired a
    /// cookie; `None` when it was malformed or named a foreign domain.
    pub fn store(&mut self, url: &Url, set_cookie: &str) -> Option<String> {
        let host = url.host_str()?;
        self.store_from(host, url.path(), set_cookie)
    }

    fn store_from(&mut self, host: &str, request_path: &str, set_cookie: &str) -> Option<String> {
        let parsed = Cookie::parse(set_cookie).ok()?;
        if parsed.name().is_empty() {
            return None;
        }

        let (domain, host_only) = match parsed.domain().map(|d| d.trim_start_matches('.')) {
            Some(domain) if !domain.is_empty() => {
                if !domain_matches(host, domain) {
                    return None;
                }
                (domain.to_ascii_lowercase(), false)
            }
            _ => (host.to_ascii_lowercase(), true),
        };
        let path = match parsed.path() {
            Some(path) if path.starts_with('/') => path.to_string(),
            _ => default_path(request_path),
        };

        let cookie = SessionCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            secure: parsed.secure().unwrap_or(false),
            host_only,
        };
        let name = cookie.name.clone();

        self.cookies.retain(|existing| !existing.same_slot(&cookie));
        if !is_expired(&parsed) {
            self.cookies.push(cookie);
        }
        Some(name)
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    /// Longer paths come first.
    pub fn header_value(&self, url: &Url) -> Option<String> {
        let mut matching: Vec<&SessionCookie> =
            self.cookies.iter().filter(|c| c.matches(url)).collect();
        if matching.is_empty() {
            return None;
        }
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        let pairs: Vec<String> = matching
            .into_iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }
}
