//! Cleanup of raw provider text before validation.
//!
//! Models frequently wrap their answer in a Markdown code fence even when told
//! not to. [`normalize`] removes one opening fence (with an optional language
//! tag) and one closing fence, trims surrounding whitespace, and repeats until
//! the text no longer changes, which makes it idempotent. Interior content is
//! never touched.

use once_cell::sync::Lazy;
use regex::Regex;

const FENCE: &str = "```";

// A bare language tag line after an opening fence, e.g. "python" or "c++".
// No `.` so an attribute access like `df.T` is kept as code.
static LANGUAGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+#-]*[ \t]*\r?$").expect("Invalid regex: language tag"));

/// Strip code-fence decoration and surrounding whitespace from `raw`.
///
/// # Example
///
/// ```rust
/// use lex_command::normalize::normalize;
///
/// assert_eq!(normalize("```python\ndf = df.dropna()\n```"), "df = df.dropna()");
/// assert_eq!(normalize("df = df.dropna()"), "df = df.dropna()");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim();
    loop {
        let next = strip_fences_once(current);
        if next == current {
            return current.to_string();
        }
        current = next;
    }
}

fn strip_fences_once(text: &str) -> &str {
    let mut body = text;

    if let Some(rest) = body.strip_prefix(FENCE) {
        body = match rest.split_once('\n') {
            Some((first_line, remainder)) if LANGUAGE_TAG.is_match(first_line) => remainder,
            None if LANGUAGE_TAG.is_match(rest) => "",
            _ => rest,
        };
    }

    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }

    body.trim()
}
