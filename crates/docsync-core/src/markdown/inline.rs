//! Inline markup to rich-text runs
//!
//! A single left-to-right scan with one combined pattern. At each match
//! position the alternatives are mutually exclusive, so a run carries at most
//! one style and runs never nest.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::blocks::RichTextRun;

/// Combined inline pattern. Alternative order matters: link/image, bold,
/// star italic, underscore italic, underline, code.
static INLINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(!?\[[^\]]*\]\([^)]+\))|(\*\*[^*]+\*\*)|(\*[^*]+\*)|(_[^_]+_)|(__[^_]+__)|(`[^`]+`)")
        .unwrap()
});

/// `[text](url)` with non-empty text
static LINK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

/// Parse one line of inline markup (block markers already stripped)
pub fn parse_inline(text: &str) -> Vec<RichTextRun> {
    let mut runs = Vec::new();
    let mut last_end = 0;

    for mat in INLINE_REGEX.find_iter(text) {
        if mat.start() > last_end {
            runs.push(RichTextRun::plain(&text[last_end..mat.start()]));
        }
        if let Some(run) = span_to_run(mat.as_str()) {
            runs.push(run);
        }
        last_end = mat.end();
    }

    if last_end < text.len() {
        runs.push(RichTextRun::plain(&text[last_end..]));
    }

    runs
}

/// Convert one matched span. Inline images and empty-text links yield nothing.
fn span_to_run(segment: &str) -> Option<RichTextRun> {
    if segment.starts_with("![") {
        // Images are only recognised as whole-line blocks
        None
    } else if segment.starts_with('[') {
        LINK_REGEX
            .captures(segment)
            .map(|caps| RichTextRun::link(&caps[1], &caps[2]))
    } else if let Some(inner) = strip_pair(segment, "**") {
        Some(RichTextRun::bold(inner))
    } else if let Some(inner) = strip_pair(segment, "__") {
        Some(RichTextRun::underline(inner))
    } else if let Some(inner) = strip_pair(segment, "*") {
        Some(RichTextRun::italic(inner))
    } else if let Some(inner) = strip_pair(segment, "_") {
        Some(RichTextRun::italic(inner))
    } else {
        strip_pair(segment, "`").map(RichTextRun::code)
    }
}

fn strip_pair<'a>(segment: &'a str, delim: &str) -> Option<&'a str> {
    segment.strip_prefix(delim)?.strip_suffix(delim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_single_run() {
        assert_eq!(parse_inline("Title"), vec![RichTextRun::plain("Title")]);
    }

    #[test]
    fn test_empty_line_has_no_runs() {
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_code_content_not_reparsed() {
        let runs = parse_inline("**bold** and `code **ignored**`");
        assert_eq!(
            runs,
            vec![
                RichTextRun::bold("bold"),
                RichTextRun::plain(" and "),
                RichTextRun::code("code **ignored**"),
            ]
        );
    }

    #[test]
    fn test_underscore_semantics() {
        assert_eq!(parse_inline("_soft_"), vec![RichTextRun::italic("soft")]);
        assert_eq!(parse_inline("__under__"), vec![RichTextRun::underline("under")]);
        assert_eq!(parse_inline("*star*"), vec![RichTextRun::italic("star")]);
    }

    #[test]
    fn test_link_run() {
        let runs = parse_inline("see [the docs](https://example.com/a) now");
        assert_eq!(
            runs,
            vec![
                RichTextRun::plain("see "),
                RichTextRun::link("the docs", "https://example.com/a"),
                RichTextRun::plain(" now"),
            ]
        );
    }

    #[test]
    fn test_empty_link_text_dropped() {
        let runs = parse_inline("a [](https://example.com) b");
        assert_eq!(runs, vec![RichTextRun::plain("a "), RichTextRun::plain(" b")]);
    }

    #[test]
    fn test_inline_image_span_emits_nothing() {
        // Observed behavior: the span is consumed but produces no run
        let runs = parse_inline("before ![logo](https://example.com/logo.png) after");
        assert_eq!(
            runs,
            vec![RichTextRun::plain("before "), RichTextRun::plain(" after")]
        );
    }

    #[test]
    fn test_unclosed_markers_stay_plain() {
        assert_eq!(
            parse_inline("2 * 3 = 6"),
            vec![RichTextRun::plain("2 * 3 = 6")]
        );
        assert_eq!(
            parse_inline("snake_case"),
            vec![RichTextRun::plain("snake_case")]
        );
    }

    #[test]
    fn test_adjacent_spans() {
        let runs = parse_inline("**a***b*`c`");
        assert_eq!(
            runs,
            vec![
                RichTextRun::bold("a"),
                RichTextRun::italic("b"),
                RichTextRun::code("c"),
            ]
        );
    }
}
