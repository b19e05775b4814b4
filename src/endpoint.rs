//! Control panel endpoints used by the free VPS renewal flow.

use std::sync::LazyLock;

use url::{Url, form_urlencoded};

use crate::ids::{UniqueId, VpsId};

pub const XSERVER_HOST: &str = "secure.xserver.ne.jp";
pub const FREE_VPS_EXTEND_PATH: &str = "/xapanel/xvps/server/freevps/extend/index";
pub const DO_FREE_VPS_EXTEND_PATH: &str = "/xapanel/xvps/server/freevps/extend/do";

static FREE_VPS_EXTEND_URL: LazyLock<Url> = LazyLock::new(|| {
    join_url(&format!("https://{XSERVER_HOST}"), FREE_VPS_EXTEND_PATH)
        .expect("extend page URL is valid")
});

static DO_FREE_VPS_EXTEND_URL: LazyLock<Url> = LazyLock::new(|| {
    join_url(&format!("https://{XSERVER_HOST}"), DO_FREE_VPS_EXTEND_PATH)
        .expect("extend submit URL is valid")
});

/// Join `path` onto `base`, keeping any path segments `base` already has.
pub fn join_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments.pop_if_empty();
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

/// Page carrying the renewal form (and its `uniqid` token) for one VPS.
pub fn free_vps_extend_url(vps_id: &VpsId) -> Url {
    let mut url = FREE_VPS_EXTEND_URL.clone();
    url.query_pairs_mut().append_pair("vpsid", vps_id.as_str());
    url
}

/// Endpoint the renewal form posts to.
pub fn do_free_vps_extend_url() -> Url {
    DO_FREE_VPS_EXTEND_URL.clone()
}

/// `uniqid=<token>&ethna_csrf=&id_vps=<id>`, URL-encoded.
pub fn renewal_form_body(vps_id: &VpsId, unique_id: &UniqueId) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("uniqid", unique_id.as_str())
        .append_pair("ethna_csrf", "")
        .append_pair("id_vps", vps_id.as_str())
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        let url = join_url("https://example.com", "path/to/resource").unwrap();
        assert_eq!(url.as_str(), "https://example.com/path/to/resource");

        let url = join_url("https://example.com/api/", "/v1/items").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/v1/items");
    }

    #[test]
    fn test_join_url_rejects_garbage() {
        assert!(join_url("not a url", "path").is_err());
    }

    #[test]
    fn test_free_vps_extend_url() {
        let url = free_vps_extend_url(&VpsId::new("12345678"));
        assert_eq!(
            url.as_str(),
            "https://secure.xserver.ne.jp/xapanel/xvps/server/freevps/extend/index?vpsid=12345678"
        );
    }

    #[test]
    fn test_do_free_vps_extend_url() {
        assert_eq!(
            do_free_vps_extend_url().as_str(),
            "https://secure.xserver.ne.jp/xapanel/xvps/server/freevps/extend/do"
        );
    }

    #[test]
    fn test_renewal_form_body() {
        let body = renewal_form_body(&VpsId::new("test-vps-id"), &UniqueId::new("csrf1234567890"));
        assert_eq!(body, "uniqid=csrf1234567890&ethna_csrf=&id_vps=test-vps-id");
    }

    #[test]
    fn test_renewal_form_body_escapes_values() {
        let body = renewal_form_body(&VpsId::new("a b"), &UniqueId::new("x&y=z"));
        assert_eq!(body, "uniqid=x%26y%3Dz&ethna_csrf=&id_vps=a+b");
    }
}
