use crate::error::{Error, Result};
use crate::types::fold;
use regex::Regex;
use std::fmt;

/// Translation mode used when compiling a glob into a regular expression.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternSyntax {
    /// Only `*` and `?` are special; every other character is literal.
    #[default]
    Strict,
    /// Only `.` is escaped before `*` and `?` are translated. Other regex
    /// metacharacters in the pattern reach the regex engine unchanged.
    Legacy,
}

impl PatternSyntax {
    pub(crate) fn tag(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Legacy => "legacy",
        }
    }
}

/// Case-insensitive glob compiled to an anchored regular expression.
///
/// `*` matches any sequence (including empty) and `?` matches exactly one
/// character. The whole value must match.
#[derive(Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compiles a glob with the given syntax.
    pub fn compile(pattern: &str, syntax: PatternSyntax) -> Result<Self> {
        let folded = fold(pattern);
        let translated = translate(&folded, syntax);
        let regex = Regex::new(&translated).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: folded.into_owned(),
            regex,
        })
    }

    /// Tests the value against the whole pattern, ignoring case.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(&fold(value))
    }

    /// Returns the lower-cased glob this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobPattern")
            .field("source", &self.source)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

fn translate(pattern: &str, syntax: PatternSyntax) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("^(?s:");
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' => out.push_str(r"\."),
            _ => match syntax {
                PatternSyntax::Strict => out.push_str(&regex::escape(ch.encode_utf8(&mut buf))),
                PatternSyntax::Legacy => out.push(ch),
            },
        }
    }
    out.push_str(")$");
    out
}
