//! Browser header template.
//!
//! The renewal requests mimic a desktop Chrome session. The header set lives
//! in a JSON file (`{"Header-Name": "value", ...}`) so it can be refreshed
//! without a rebuild.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{RenewError, Result};

pub const DEFAULT_HEADERS_PATH: &str = "assets/headers/chrome-macos.json";

/// Header name to value, sent verbatim on every request. Empty values mark
/// headers the transport fills in itself.
pub type HeaderSet = BTreeMap<String, String>;

/// Fields forced at load time, regardless of the template.
const OVERRIDES: [(&str, &str); 4] = [
    ("host", ""),
    ("connection", ""),
    ("accept-encoding", ""),
    ("accept-language", "ja"),
];

pub fn parse_header_file<R: Read>(reader: R) -> Result<HeaderSet> {
    serde_json::from_reader(reader).map_err(|e| RenewError::Parse {
        context: "header template",
        message: e.to_string(),
    })
}

/// Load the header template and apply the fixed overrides.
///
/// A relative `path` resolves against the working directory.
pub fn load_headers(path: impl AsRef<Path>) -> Result<HeaderSet> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| RenewError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut headers = parse_header_file(BufReader::new(file))?;
    apply_overrides(&mut headers);
    tracing::debug!(path = %path.display(), count = headers.len(), "Loaded header template");
    Ok(headers)
}

fn apply_overrides(headers: &mut HeaderSet) {
    for (name, value) in OVERRIDES {
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        headers.insert(name.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

    #[test]
    fn test_parse_header_file() {
        let json = format!(r#"{{"User-Agent":"{CHROME_UA}"}}"#);
        let headers = parse_header_file(json.as_bytes()).unwrap();
        assert_eq!(headers.get("User-Agent").map(String::as_str), Some(CHROME_UA));
    }

    #[test]
    fn test_parse_header_file_rejects_non_object() {
        let err = parse_header_file(&b"[1, 2, 3]"[..]).unwrap_err();
        assert!(matches!(err, RenewError::Parse { .. }));
    }

    #[test]
    fn test_load_headers() {
        let headers =
            load_headers(Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_HEADERS_PATH)).unwrap();

        assert!(!headers.is_empty());
        assert!(headers.contains_key("User-Agent"));
        assert_eq!(headers.get("accept-language").map(String::as_str), Some("ja"));
        assert_eq!(headers.get("host").map(String::as_str), Some(""));
        assert_eq!(headers.get("connection").map(String::as_str), Some(""));
        assert_eq!(headers.get("accept-encoding").map(String::as_str), Some(""));
    }

    #[test]
    fn test_overrides_replace_any_casing() {
        let mut headers = HeaderSet::new();
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());
        headers.insert("Accept-Encoding".to_string(), "gzip".to_string());

        apply_overrides(&mut headers);

        assert!(!headers.contains_key("Accept-Language"));
        assert!(!headers.contains_key("Accept-Encoding"));
        assert_eq!(headers.get("accept-language").map(String::as_str), Some("ja"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_headers("assets/headers/does-not-exist.json").unwrap_err();
        match err {
            RenewError::Io { path, .. } => {
                assert_eq!(path, "assets/headers/does-not-exist.json");
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
