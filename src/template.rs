//! HTML page for the diagnostic server.
//!
//! Templates are plain HTML with `{{field}}` placeholders. Every substituted
//! value is HTML-escaped; unknown placeholders are left as they are.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::{TIMESTAMP_FORMAT, UserAgentRecord};

pub const DEFAULT_TEMPLATE_PATH: &str = "assets/templates/index.html";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not loaded")]
    NotLoaded,
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Values available to the page template.
#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub user_agent: String,
    pub remote_addr: String,
    pub method: String,
    pub request_uri: String,
    pub timestamp: String,
    pub headers_formatted: String,
}

impl PageData {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "user_agent" => Some(&self.user_agent),
            "remote_addr" => Some(&self.remote_addr),
            "method" => Some(&self.method),
            "request_uri" => Some(&self.request_uri),
            "timestamp" => Some(&self.timestamp),
            "headers_formatted" => Some(&self.headers_formatted),
            _ => None,
        }
    }
}

impl From<&UserAgentRecord> for PageData {
    fn from(record: &UserAgentRecord) -> Self {
        Self {
            user_agent: record.user_agent.clone(),
            remote_addr: record.remote_addr.clone(),
            method: record.method.clone(),
            request_uri: record.request_uri.clone(),
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            headers_formatted: record.formatted_headers(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    template: Option<String>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            template: Some(source.into()),
        }
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), TemplateError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.template = Some(source);
        Ok(())
    }

    pub fn render(&self, data: &PageData) -> Result<String, TemplateError> {
        let template = self.template.as_deref().ok_or(TemplateError::NotLoaded)?;

        let mut out = String::with_capacity(template.len() + 256);
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                // unterminated placeholder, copy the tail verbatim
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let placeholder = &rest[start..start + 2 + end + 2];
            match data.field(after_open[..end].trim()) {
                Some(value) => out.push_str(&html_escape(value)),
                None => out.push_str(placeholder),
            }
            rest = &after_open[end + 2..];
        }
        out.push_str(rest);

        Ok(out)
    }
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
