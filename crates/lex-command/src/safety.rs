//! Static safety gate for generated dataframe code.
//!
//! Generated snippets are classified without ever being executed. The gate is
//! two-sided: a snippet must avoid every block pattern *and* match at least
//! one allow pattern. The two sentinel replies the model is instructed to
//! produce are always accepted.
//!
//! Evaluation order is fixed and short-circuiting:
//!
//! 1. Sentinel bypass (`Can you elaborate?`, `This operation is not possible`,
//!    or the empty string)
//! 2. Block-list scan, case-insensitive, first match wins
//! 3. Allow-list requirement, case-sensitive
//!
//! # Example
//!
//! ```rust
//! use lex_command::safety::{self, Verdict};
//!
//! assert!(safety::is_safe("df = df.dropna()"));
//! assert!(!safety::is_safe("import os"));
//! assert_eq!(safety::validate("x = 1 + 1"), Verdict::NoRecognizedTransform);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Reply the model gives when the instruction is ambiguous.
pub const CLARIFICATION_SENTINEL: &str = "Can you elaborate?";

/// Reply the model gives when the instruction is impossible or dangerous.
pub const NOT_POSSIBLE_SENTINEL: &str = "This operation is not possible";

/// Identifier the generated code must operate on.
pub const DATAFRAME_IDENT: &str = "df";

/// A named deny rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRule {
    /// Short human-readable rule name, used in logs.
    pub name: &'static str,
    /// The regular expression source.
    pub pattern: &'static str,
}

/// Ordered deny rules. Matched case-insensitively.
///
/// The `for` rule is special: a `for` loop is tolerated when the rest of its
/// line reaches `in`, followed by whitespace (possibly a line break) and `df`. The `regex` crate has no
/// lookahead, so that exemption lives in [`matches_block_rule`].
const BLOCK_RULES: &[BlockRule] = &[
    BlockRule { name: "import statement", pattern: r"import\s+" },
    BlockRule { name: "dunder access", pattern: r"__" },
    BlockRule { name: "os module", pattern: r"os\." },
    BlockRule { name: "sys module", pattern: r"sys\." },
    BlockRule { name: "subprocess", pattern: r"subprocess" },
    BlockRule { name: "eval call", pattern: r"eval\s*\(" },
    BlockRule { name: "exec call", pattern: r"exec\s*\(" },
    BlockRule { name: "open call", pattern: r"open\s*\(" },
    BlockRule { name: "pickle", pattern: r"pickle" },
    BlockRule { name: "while loop", pattern: r"while\s+" },
    BlockRule { name: "for loop", pattern: FOR_LOOP_PATTERN },
    BlockRule { name: "lambda", pattern: r"lambda\s+" },
    BlockRule { name: "statement separator", pattern: r";" },
    BlockRule { name: "file access", pattern: r"file" },
    BlockRule { name: "write", pattern: r"write" },
    BlockRule { name: "csv read", pattern: r"read_csv" },
    BlockRule { name: "csv write", pattern: r"to_csv" },
];

const FOR_LOOP_PATTERN: &str = r"for\s+";

/// Allow patterns: dataframe indexing/attribute access, transformation verbs,
/// and `pd.` namespace calls. Matched case-sensitively.
const ALLOW_PATTERNS: &[&str] = &[
    r"df\s*\[",
    r"df\s*\.",
    r"pd\.",
    r"to_datetime",
    r"str\.",
    r"fillna",
    r"drop",
    r"rename",
    r"apply",
    r"map",
    r"replace",
    r"astype",
    r"query",
    r"round",
    r"upper",
    r"lower",
    r"strip",
    r"dropna",
    r"isnull",
    r"value_counts",
    r"groupby",
    r"sort_values",
];

// Compiled once at startup
static BLOCK_REGEXES: Lazy<Vec<(BlockRule, Regex)>> = Lazy::new(|| {
    BLOCK_RULES
        .iter()
        .map(|rule| {
            let regex = Regex::new(&format!("(?i){}", rule.pattern))
                .expect("Invalid regex: block rule");
            (*rule, regex)
        })
        .collect()
});

static ALLOW_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ALLOW_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Invalid regex: allow pattern"))
        .collect()
});

// `[^\n]*` stays on the loop's line; the whitespace before `df` may not
static ITERATES_DATAFRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[^\n]*in\s+df").expect("Invalid regex: dataframe iteration"));

/// The outcome of classifying one snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The snippet passed the block list and matched the allow list.
    Safe,
    /// The snippet is a sentinel reply (or empty) and is not executable code.
    Sentinel,
    /// The snippet matched a block rule.
    Blocked { rule: BlockRule },
    /// The snippet matched no allow pattern.
    NoRecognizedTransform,
}

impl Verdict {
    /// Whether the snippet may be handed back to the client.
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe | Verdict::Sentinel)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Safe => write!(f, "safe"),
            Verdict::Sentinel => write!(f, "safe (sentinel reply)"),
            Verdict::Blocked { rule } => {
                write!(f, "unsafe: blocked by {} ({})", rule.name, rule.pattern)
            }
            Verdict::NoRecognizedTransform => {
                write!(f, "unsafe: no recognized dataframe transformation")
            }
        }
    }
}

/// Returns `true` if `code` is empty or, ignoring surrounding whitespace,
/// one of the sentinel replies.
///
/// Whitespace-only input is not a sentinel: it falls through to the allow
/// list and is rejected. Normalized completions are trimmed, so the pipeline
/// only ever sees `""` for a blank reply.
pub fn is_sentinel(code: &str) -> bool {
    if code.is_empty() {
        return true;
    }
    let trimmed = code.trim();
    trimmed == CLARIFICATION_SENTINEL || trimmed == NOT_POSSIBLE_SENTINEL
}

/// Classify a normalized code snippet.
///
/// Pure and deterministic: no I/O and no execution of the candidate code.
pub fn validate(code: &str) -> Verdict {
    if is_sentinel(code) {
        return Verdict::Sentinel;
    }

    for (rule, regex) in BLOCK_REGEXES.iter() {
        if matches_block_rule(rule, regex, code) {
            return Verdict::Blocked { rule: *rule };
        }
    }

    if !ALLOW_REGEXES.iter().any(|regex| regex.is_match(code)) {
        return Verdict::NoRecognizedTransform;
    }

    Verdict::Safe
}

/// Convenience wrapper over [`validate`].
pub fn is_safe(code: &str) -> bool {
    validate(code).is_safe()
}

fn matches_block_rule(rule: &BlockRule, regex: &Regex, code: &str) -> bool {
    if rule.pattern != FOR_LOOP_PATTERN {
        return regex.is_match(code);
    }

    // `for\s+` is blocked unless the remainder of its line reaches `in`
    // followed by whitespace and `df`.
    // The whitespace run may be matched at any length, so every split point
    // after the keyword is a candidate, as a backtracking lookahead would try.
    regex.find_iter(code).any(|m| {
        let keyword_end = m.start() + "for".len();
        code[keyword_end..m.end()]
            .char_indices()
            .map(|(offset, ch)| keyword_end + offset + ch.len_utf8())
            .any(|split| !ITERATES_DATAFRAME.is_match(&code[split..]))
    })
}
