use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the VPS instance being renewed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VpsId(String);

impl VpsId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VpsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VpsId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for VpsId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Single-use token (`uniqid`) scraped from the renewal form.
///
/// It authorizes exactly one renewal POST and must be forwarded unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(String);

impl UniqueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UniqueId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(VpsId::new("vps-12345").to_string(), "vps-12345");
        assert_eq!(VpsId::new("").to_string(), "");
        assert_eq!(UniqueId::new("unique-12345").to_string(), "unique-12345");
        assert_eq!(UniqueId::new("").to_string(), "");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&VpsId::from("12345")).unwrap();
        assert_eq!(json, "\"12345\"");
    }
}
