//! Safety layer for generated text.
//!
//! Generator output is shown to the user as markdown. Script and iframe
//! blocks and inline event-handler tokens are removed before it leaves the
//! engine; ordinary markdown is left alone.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").expect("script pattern"));

static IFRAME_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<iframe[^>]*>.*?</iframe\s*>").expect("iframe pattern"));

/// Unbalanced opening or closing tags left after block removal.
static STRAY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?\s*(script|iframe)[^>]*>").expect("stray tag pattern"));

static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(onclick|onerror|onload)\b|\bjavascript:").expect("handler pattern")
});

/// Result of sanitizing generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedOutput {
    pub content: String,
    pub was_modified: bool,
}

/// Strip active content from generated text and trim it.
pub fn sanitize_response(text: &str) -> SanitizedOutput {
    let stripped = SCRIPT_BLOCK.replace_all(text, "");
    let stripped = IFRAME_BLOCK.replace_all(&stripped, "");
    let stripped = STRAY_TAG.replace_all(&stripped, "");
    let stripped = EVENT_HANDLER.replace_all(&stripped, "");
    let content = stripped.trim().to_string();
    let was_modified = content != text.trim();
    SanitizedOutput {
        content,
        was_modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_markdown_untouched() {
        let text = "You're eligible for **NSP Post Matric**.\n\n- Apply online";
        let out = sanitize_response(text);
        assert_eq!(out.content, text);
        assert!(!out.was_modified);
    }

    #[test]
    fn script_and_iframe_blocks_removed() {
        let out = sanitize_response(
            "Hi <script type=\"text/javascript\">alert('x')</script>there<IFRAME src=x>\n</IFRAME>!",
        );
        assert_eq!(out.content, "Hi there!");
        assert!(out.was_modified);
    }

    #[test]
    fn unclosed_script_tag_removed() {
        let out = sanitize_response("ok <script src=evil.js>");
        assert_eq!(out.content, "ok");
    }

    #[test]
    fn event_handlers_and_js_urls_removed() {
        let out = sanitize_response("<a onclick=\"x()\" href=\"javascript:void(0)\">link</a>");
        assert!(!out.content.to_lowercase().contains("onclick"));
        assert!(!out.content.to_lowercase().contains("javascript:"));
        assert!(out.content.contains("link"));
    }

    #[test]
    fn only_active_content_becomes_empty() {
        assert_eq!(sanitize_response("  <script>x</script>  ").content, "");
    }
}
