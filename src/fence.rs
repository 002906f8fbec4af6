//! Code-fence extraction for agent replies.
//!
//! The scanner walks the reply once. An opening marker must start its line
//! (after optional indentation) and carry at most one info token before the
//! line break; anything else is prose and is skipped. The body starts on the
//! next line and runs verbatim up to the next marker. Only the first fence per
//! language is kept.

use std::collections::BTreeSet;

use crate::buffer::BufferId;

const FENCE_MARKER: &str = "```";

/// A labeled block lifted from a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFence {
    /// Normalized language tag (`js` is reported as `javascript`).
    pub language: String,
    pub body: String,
}

impl ParsedFence {
    /// The editor buffer this fence targets, if its language maps to one.
    pub fn buffer(&self) -> Option<BufferId> {
        BufferId::from_language(&self.language)
    }
}

/// Lowercases the first token of an info string and folds aliases.
pub fn normalize_language(info: &str) -> Option<String> {
    let token = info.split_whitespace().next()?.to_ascii_lowercase();
    Some(match token.as_str() {
        "js" => "javascript".to_owned(),
        _ => token,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Looking for an opening marker.
    Outside,
    /// Just past an opening marker, reading the info string.
    InfoString { marker_end: usize },
    /// Inside a fence body.
    Body { language_start: usize, language_end: usize, body_start: usize },
}

/// Single pass tokenizer over a completion's text.
#[derive(Debug)]
pub struct FenceScanner<'a> {
    text: &'a str,
    cursor: usize,
    state: ScanState,
}

/// One raw fence as it appeared in the text, before de-duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFence<'a> {
    pub info: &'a str,
    pub body: &'a str,
}

impl<'a> FenceScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            cursor: 0,
            state: ScanState::Outside,
        }
    }
}

impl<'a> Iterator for FenceScanner<'a> {
    type Item = RawFence<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.text[self.cursor..];
            match self.state {
                ScanState::Outside => {
                    let offset = rest.find(FENCE_MARKER)?;
                    let marker_start = self.cursor + offset;
                    let marker_end = marker_start + FENCE_MARKER.len();
                    self.cursor = marker_end;
                    if starts_line(self.text, marker_start) {
                        self.state = ScanState::InfoString { marker_end };
                    }
                }
                ScanState::InfoString { marker_end } => {
                    // An opening marker with no line break after it cannot open a body.
                    let newline = rest.find('\n')?;
                    let info_end = marker_end + newline;
                    let info = self.text[marker_end..info_end].trim();
                    if info.contains('`') || info.split_whitespace().nth(1).is_some() {
                        self.state = ScanState::Outside;
                        continue;
                    }
                    let language_start = marker_end + (self.text[marker_end..info_end].len()
                        - self.text[marker_end..info_end].trim_start().len());
                    self.cursor = info_end + 1;
                    self.state = ScanState::Body {
                        language_start,
                        language_end: language_start + info.len(),
                        body_start: self.cursor,
                    };
                }
                ScanState::Body {
                    language_start,
                    language_end,
                    body_start,
                } => {
                    let offset = rest.find(FENCE_MARKER)?;
                    let body_end = self.cursor + offset;
                    self.cursor = body_end + FENCE_MARKER.len();
                    self.state = ScanState::Outside;
                    return Some(RawFence {
                        info: &self.text[language_start..language_end],
                        body: &self.text[body_start..body_end],
                    });
                }
            }
        }
    }
}

fn starts_line(text: &str, index: usize) -> bool {
    let line_prefix = text[..index].rsplit('\n').next().unwrap_or_default();
    line_prefix.chars().all(|ch| ch == ' ' || ch == '\t')
}

/// Extracts labeled fences in source order, keeping the first per language.
///
/// Unlabeled fences are consumed but not reported. Unterminated fences are
/// ignored. Fence bodies are never inspected.
pub fn extract(text: &str) -> Vec<ParsedFence> {
    let mut seen = BTreeSet::new();
    let mut fences = Vec::new();
    for raw in FenceScanner::new(text) {
        let Some(language) = normalize_language(raw.info) else {
            continue;
        };
        if !seen.insert(language.clone()) {
            continue;
        }
        fences.push(ParsedFence {
            language,
            body: raw.body.to_owned(),
        });
    }
    fences
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{extract, normalize_language, FenceScanner, ParsedFence};
    use crate::buffer::BufferId;

    fn fence(language: &str, body: &str) -> ParsedFence {
        ParsedFence {
            language: language.to_owned(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn extracts_each_distinct_language_with_exact_bodies() {
        let reply = "Here you go:\n```html\n<main>\n  <p>hi</p>\n</main>\n```\n\n```css\nbody {\n\tcolor: red;\n}\n```\nand\n```javascript\nconsole.log(1);\n```";

        assert_eq!(
            extract(reply),
            vec![
                fence("html", "<main>\n  <p>hi</p>\n</main>\n"),
                fence("css", "body {\n\tcolor: red;\n}\n"),
                fence("javascript", "console.log(1);\n"),
            ]
        );
    }

    #[test]
    fn first_fence_wins_for_repeated_language() {
        let reply = "```html\n<p>first</p>\n```\n```html\n<p>second</p>\n```";
        assert_eq!(extract(reply), vec![fence("html", "<p>first</p>\n")]);
    }

    #[test]
    fn js_alias_matches_javascript() {
        let aliased = extract("```js\nlet x = 1;\n```");
        let canonical = extract("```javascript\nlet x = 1;\n```");
        assert_eq!(aliased, canonical);
        assert_eq!(aliased[0].buffer(), Some(BufferId::Script));
    }

    #[test]
    fn js_and_javascript_count_as_one_language() {
        let reply = "```javascript\nfirst();\n```\n```js\nsecond();\n```";
        assert_eq!(extract(reply), vec![fence("javascript", "first();\n")]);
    }

    #[test]
    fn unlabeled_and_unterminated_fences_are_ignored() {
        assert!(extract("```\nplain\n```").is_empty());
        assert!(extract("```css\nbody{}").is_empty());
        assert!(extract("no fences at all").is_empty());
    }

    #[test]
    fn unlabeled_fence_does_not_shift_pairing() {
        let reply = "```\nnot code\n```\n```css\na{}\n```";
        assert_eq!(extract(reply), vec![fence("css", "a{}\n")]);
    }

    #[test]
    fn empty_body_is_accepted() {
        assert_eq!(extract("```css\n```"), vec![fence("css", "")]);
    }

    #[test]
    fn info_string_is_normalized() {
        assert_eq!(normalize_language("HTML"), Some("html".to_owned()));
        assert_eq!(normalize_language("js"), Some("javascript".to_owned()));
        assert_eq!(normalize_language("   "), None);

        let reply = "```CSS \r\nbody{}\r\n```";
        assert_eq!(extract(reply), vec![fence("css", "body{}\r\n")]);
    }

    #[test]
    fn marker_mentioned_in_prose_does_not_shadow_the_real_block() {
        let reply = "Updated (wrapped in ```html blocks):\n```html\n<p>new</p>\n```";
        assert_eq!(extract(reply), vec![fence("html", "<p>new</p>\n")]);
    }

    #[test]
    fn mid_line_marker_is_not_an_opener() {
        let reply = "Wrap it as ```css like this:\n```css\na{}\n```";
        assert_eq!(extract(reply), vec![fence("css", "a{}\n")]);
    }

    #[test]
    fn multi_token_info_line_is_skipped_as_prose() {
        let reply = "```html is the tag to use\n```html\n<b>x</b>\n```";
        assert_eq!(extract(reply), vec![fence("html", "<b>x</b>\n")]);
    }

    #[test]
    fn unknown_languages_are_reported_without_a_buffer() {
        let fences = extract("```python\nprint(1)\n```");
        assert_eq!(fences, vec![fence("python", "print(1)\n")]);
        assert_eq!(fences[0].buffer(), None);
    }

    #[test]
    fn scanner_yields_raw_fences_in_source_order() {
        let raw: Vec<_> = FenceScanner::new("```a\n1\n```\n  ```b\n2\n```")
            .map(|fence| (fence.info, fence.body))
            .collect();
        assert_eq!(raw, vec![("a", "1\n"), ("b", "2\n")]);
    }
}
