//! Best-effort stripping of non-JSON artifacts from model output
//!
//! Models wrap correct JSON in commentary, fences, or stray tags despite
//! instructions. Brace-slicing recovers the payload without a full parser;
//! when no braces exist the text passes through and the downstream parse
//! failure carries the full text.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z]*\n?").expect("fence pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

/// Strip fences, tags, and surrounding prose from a raw completion.
/// Never fails; the result is a candidate JSON string, not yet parseable.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = FENCE.replace_all(trimmed, "");
    let untagged = TAG.replace_all(&unfenced, "");
    let text: &str = &untagged;
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_language_tagged_fence() {
        let raw = "```json\n{\"srs\":\"A\",\"frd\":\"B\",\"brd\":\"C\",\"umlDiagrams\":[]}\n```";
        assert_eq!(
            normalize(raw),
            "{\"srs\":\"A\",\"frd\":\"B\",\"brd\":\"C\",\"umlDiagrams\":[]}"
        );
    }

    #[test]
    fn strips_bare_fences_anywhere() {
        let raw = "Here you go:\n```\n{\"a\":1}\n```\nHope that helps!";
        assert_eq!(normalize(raw), "{\"a\":1}");
    }

    #[test]
    fn strips_angle_bracket_tags() {
        let raw = "Sure! <answer>{\"srs\":\"A\"}</answer>";
        assert_eq!(normalize(raw), "{\"srs\":\"A\"}");
    }

    #[test]
    fn slices_to_outermost_braces() {
        let raw = "The requested document follows. {\"key\":\"value\"} Let me know!";
        assert_eq!(normalize(raw), "{\"key\":\"value\"}");
    }

    #[test]
    fn passes_through_without_braces() {
        let raw = "I could not produce a document.";
        assert_eq!(normalize(raw), "I could not produce a document.");
    }

    #[test]
    fn passes_through_inverted_braces() {
        assert_eq!(normalize("} nothing here {"), "} nothing here {");
    }

    #[test]
    fn idempotent_on_clean_text() {
        let cases = [
            "{\"srs\":\"A\",\"frd\":\"B\"}",
            "plain prose, no payload",
            "{\"nested\":{\"deep\":[1,2,3]}}",
        ];
        for case in cases {
            let once = normalize(case);
            assert_eq!(normalize(&once), once);
        }
    }
}
