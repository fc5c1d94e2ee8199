use once_cell::sync::Lazy;
use regex::Regex;

/// Tags the editor accepts from generated copy
pub const ALLOWED_TAGS: &[&str] = &["h2", "h3", "p", "ul", "ol", "li", "strong", "em", "br"];

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("Invalid regex"));
static DROPPED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("Invalid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*?(/?)>").expect("Invalid regex"));

/// Reduces model output to the allowed tag subset.
///
/// Allowed tags are kept without attributes, other tags are dropped with their text kept,
/// and markdown code fences around the answer are removed.
pub fn sanitize(raw: &str) -> String {
    let unfenced = CODE_FENCE.replace_all(raw, "");
    let without_blocks = DROPPED_BLOCK.replace_all(&unfenced, "");
    let cleaned = TAG.replace_all(&without_blocks, |caps: &regex::Captures| {
        let name = caps[2].to_ascii_lowercase();
        if !ALLOWED_TAGS.contains(&name.as_str()) {
            return String::new();
        }
        if name == "br" {
            return "<br>".to_string();
        }
        format!("<{}{}>", &caps[1], name)
    });
    cleaned.trim().to_string()
}

/// Every tag in `html` belongs to [`ALLOWED_TAGS`].
pub fn uses_only_allowed_tags(html: &str) -> bool {
    TAG.captures_iter(html)
        .all(|caps| ALLOWED_TAGS.contains(&caps[2].to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_allowed_tags_and_strips_attributes() {
        let out = sanitize(r#"<p class="lead">Hello <strong>there</strong><br/></p>"#);
        assert_eq!(out, "<p>Hello <strong>there</strong><br></p>");
    }

    #[test]
    fn drops_disallowed_tags_but_keeps_text() {
        let out = sanitize(r#"<div><h1>Title</h1><a href="x">link</a><script>alert(1)</script></div>"#);
        assert_eq!(out, "Titlelink");
        assert!(uses_only_allowed_tags(&out));
    }

    #[test]
    fn strips_code_fences() {
        let out = sanitize("```html\n<h2>Big</h2>\n<p>Copy</p>\n```");
        assert_eq!(out, "<h2>Big</h2>\n<p>Copy</p>");
    }

    #[test]
    fn detects_foreign_tags() {
        assert!(uses_only_allowed_tags("<ul><li>a</li></ul>"));
        assert!(!uses_only_allowed_tags("<span>a</span>"));
    }
}
