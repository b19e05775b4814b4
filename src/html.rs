//! Scraping the control panel's HTML.
//!
//! Everything here is tied to the panel's current markup: the hidden
//! `uniqid` input on the renewal form, the Japanese completion message, and
//! the `main .contents` region used for error text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{RenewError, Result};
use crate::ids::UniqueId;

/// Shown by the panel once the renewal has gone through.
pub const SUCCESS_PHRASE: &str = "利用期限の更新手続きが完了しました。";

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static UNIQUE_ID: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input[type=hidden][name=uniqid]").expect("uniqid selector is valid")
});

static MAIN_CONTENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main .contents").expect("contents selector is valid"));

static MAIN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main").expect("main selector is valid"));

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn contains_success_phrase(body: &str) -> bool {
    body.contains(SUCCESS_PHRASE)
}

/// Pull the renewal token out of the form page.
///
/// Every hidden `uniqid` input carrying a `value` attribute overwrites the
/// previous one, so the last one in document order wins. An empty final
/// value counts as not found.
pub fn find_unique_id(body: &str) -> Result<UniqueId> {
    let document = Html::parse_document(body);

    let token = document
        .select(&UNIQUE_ID)
        .filter_map(|input| input.value().attr("value"))
        .last()
        .filter(|value| !value.is_empty())
        .ok_or(RenewError::TokenNotFound)?;

    Ok(UniqueId::new(token))
}

/// Best-effort error text from a failed renewal page.
///
/// Prefers the `.contents` blocks inside `main`, then falls back to the text
/// of `main` itself. Each block is whitespace-collapsed; empty blocks are
/// skipped and the rest joined with `", "`. `None` when nothing readable
/// remains.
pub fn find_error_message(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    for region in [&*MAIN_CONTENTS, &*MAIN] {
        let texts: Vec<String> = document
            .select(region)
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .collect();

        if !texts.is_empty() {
            return Some(texts.join(", "));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_unique_id() {
        let html = r#"<html>
            <body>
                <form>
                    <input type="hidden" name="uniqid" value="abc123def456" />
                    <input type="submit" value="Submit" />
                </form>
            </body>
        </html>"#;
        assert_eq!(find_unique_id(html).unwrap(), UniqueId::new("abc123def456"));
    }

    #[test]
    fn test_find_unique_id_last_wins() {
        let html = r#"<form>
            <input type="hidden" name="uniqid" value="first123" />
            <input type="hidden" name="uniqid" value="second456" />
        </form>"#;
        assert_eq!(find_unique_id(html).unwrap(), UniqueId::new("second456"));
    }

    #[test]
    fn test_find_unique_id_valueless_input_does_not_override() {
        let html = r#"<form>
            <input type="hidden" name="uniqid" value="kept789" />
            <input type="hidden" name="uniqid" />
        </form>"#;
        assert_eq!(find_unique_id(html).unwrap(), UniqueId::new("kept789"));
    }

    #[test]
    fn test_find_unique_id_not_found() {
        let cases = [
            // other hidden inputs only
            r#"<form><input type="hidden" name="token" value="abc123" /></form>"#,
            // empty value
            r#"<form><input type="hidden" name="uniqid" value="" /></form>"#,
            // no value attribute
            r#"<form><input type="hidden" name="uniqid" /></form>"#,
            // visible input with the right name
            r#"<form><input type="text" name="uniqid" value="visible" /></form>"#,
            // later empty value wins over an earlier one
            r#"<form>
                <input type="hidden" name="uniqid" value="stale" />
                <input type="hidden" name="uniqid" value="" />
            </form>"#,
            "<invalid><html>",
        ];

        for html in cases {
            let result = find_unique_id(html);
            assert!(
                matches!(result, Err(RenewError::TokenNotFound)),
                "expected TokenNotFound for {html:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_find_unique_id_nested_form() {
        let html = r#"<!DOCTYPE html>
        <html>
            <head><title>Test</title></head>
            <body>
                <div class="container">
                    <form method="post" action="/submit">
                        <div class="form-group">
                            <input type="text" name="username" />
                        </div>
                        <input type="hidden" name="csrf_token" value="other123" />
                        <input type="hidden" name="uniqid" value="complex789xyz" />
                        <div class="form-group">
                            <input type="password" name="password" />
                        </div>
                    </form>
                </div>
            </body>
        </html>"#;
        assert_eq!(find_unique_id(html).unwrap(), UniqueId::new("complex789xyz"));
    }

    #[test]
    fn test_error_message_single_block() {
        let html = r#"<main><div class="contents">エラーが発生しました。</div></main>"#;
        assert_eq!(
            find_error_message(html).as_deref(),
            Some("エラーが発生しました。")
        );
    }

    #[test]
    fn test_error_message_collapses_whitespace() {
        let html = r#"<main>
            <div class="contents">
                エラーが発生しました。
                再試行してください。
            </div>
        </main>"#;
        assert_eq!(
            find_error_message(html).as_deref(),
            Some("エラーが発生しました。 再試行してください。")
        );
    }

    #[test]
    fn test_error_message_joins_blocks_and_skips_empty() {
        let html = r#"<main>
            <div class="contents"></div>
            <div class="contents">エラー1: 無効な入力です。</div>
            <div class="contents">   </div>
            <div class="contents">
                <p>エラー2:</p>
                <span>セッションが無効です。</span>
            </div>
        </main>"#;
        assert_eq!(
            find_error_message(html).as_deref(),
            Some("エラー1: 無効な入力です。, エラー2: セッションが無効です。")
        );
    }

    #[test]
    fn test_error_message_spans_multiple_main_elements() {
        let html = r#"<body>
            <header>ヘッダー</header>
            <main><div class="contents">メインエラー: システムエラーが発生しました</div></main>
            <main><div class="contents">セカンダリエラー: データベース接続エラー</div></main>
            <footer>フッター</footer>
        </body>"#;
        assert_eq!(
            find_error_message(html).as_deref(),
            Some("メインエラー: システムエラーが発生しました, セカンダリエラー: データベース接続エラー")
        );
    }

    #[test]
    fn test_error_message_falls_back_to_main() {
        let html = r#"<body>
            <div class="contents">これはmainの中にありません</div>
            <main>
                <div class="other">これは.contentsではありません</div>
            </main>
        </body>"#;
        assert_eq!(
            find_error_message(html).as_deref(),
            Some("これは.contentsではありません")
        );
    }

    #[test]
    fn test_error_message_none() {
        let empty_contents = r#"<main>
            <div class="contents"></div>
            <div class="contents">   </div>
        </main>"#;
        assert_eq!(find_error_message(empty_contents), None);
        assert_eq!(find_error_message("<invalid><html>"), None);
        assert_eq!(find_error_message("<p>no main here</p>"), None);
    }

    #[test]
    fn test_success_phrase() {
        let html = "<html><body><p>利用期限の更新手続きが完了しました。</p></body></html>";
        assert!(contains_success_phrase(html));
        assert!(!contains_success_phrase("<p>利用期限の更新手続き</p>"));
    }

    #[test]
    fn test_selectors_parse() {
        LazyLock::force(&UNIQUE_ID);
        LazyLock::force(&MAIN_CONTENTS);
        LazyLock::force(&MAIN);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
