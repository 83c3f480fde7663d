//! Front-matter splitting.
//!
//! A document may start with a YAML header fenced by `---` lines:
//!
//! ```text
//! ---
//! query:
//!   contains: "{{#each"
//! title: Iterating in templates
//! ---
//! Body text...
//! ```
//!
//! The closing fence may also be `...`. Without an opening fence on the first
//! line, or without a closing fence, the whole text is body.

use serde_json::Value;

const FENCE: &str = "---";
const ALT_CLOSE: &str = "...";

/// Header and body slices of a document.
struct Split<'a> {
    header: Option<&'a str>,
    body: &'a str,
}

fn split(text: &str) -> Split<'_> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let no_header = Split {
        header: None,
        body: text,
    };

    let Some((first, rest)) = text.split_once('\n') else {
        return no_header;
    };
    if first.trim_end() != FENCE {
        return no_header;
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == FENCE || trimmed == ALT_CLOSE {
            return Split {
                header: Some(&rest[..offset]),
                body: &rest[offset + line.len()..],
            };
        }
        offset += line.len();
    }
    no_header
}

/// Parsed header data, or `None` when the document has no header block.
///
/// An empty header block yields `Some(Value::Null)`.
pub fn header_data(text: &str) -> Result<Option<Value>, serde_yaml::Error> {
    match split(text).header {
        None => Ok(None),
        Some(header) if header.trim().is_empty() => Ok(Some(Value::Null)),
        Some(header) => serde_yaml::from_str(header).map(Some),
    }
}

/// Everything after the header block.
pub fn body(text: &str) -> &str {
    split(text).body
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_header_and_body() {
        let text = "---\nquery:\n  contains: each\ntitle: Loops\n---\nUse {{#each}}.\n";
        assert_eq!(
            header_data(text).unwrap(),
            Some(json!({"query": {"contains": "each"}, "title": "Loops"}))
        );
        assert_eq!(body(text), "Use {{#each}}.\n");
    }

    #[test]
    fn test_no_header() {
        let text = "# Plain markdown\n\nNo front matter.";
        assert_eq!(header_data(text).unwrap(), None);
        assert_eq!(body(text), text);
    }

    #[test]
    fn test_unterminated_header_is_body() {
        let text = "---\ntitle: oops\nno closing fence";
        assert_eq!(header_data(text).unwrap(), None);
        assert_eq!(body(text), text);
    }

    #[test]
    fn test_empty_header() {
        let text = "---\n---\nbody";
        assert_eq!(header_data(text).unwrap(), Some(Value::Null));
        assert_eq!(body(text), "body");
    }

    #[test]
    fn test_header_without_body() {
        let text = "---\ntitle: x\n---\n";
        assert_eq!(header_data(text).unwrap(), Some(json!({"title": "x"})));
        assert_eq!(body(text), "");
    }

    #[test]
    fn test_dots_close_header_and_crlf() {
        let text = "---\r\ntitle: x\r\n...\r\nbody";
        assert_eq!(header_data(text).unwrap(), Some(json!({"title": "x"})));
        assert_eq!(body(text), "body");
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(header_data("---\nquery: [unclosed\n---\n").is_err());
    }
}
