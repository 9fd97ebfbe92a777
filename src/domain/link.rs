use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::domain::strip_extension;

static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("link pattern is valid"));

/// A wiki-style back-link naming the document another was compiled into.
///
/// Formatted as `[[target]]`, where `target` is the base name of the target
/// document (its filename without extension).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    target: String,
}

impl Link {
    /// Creates a link to the given document.
    ///
    /// Accepts either a base name or a filename; a trailing document extension
    /// is dropped.
    #[must_use]
    pub fn to(document: &str) -> Self {
        Self {
            target: strip_extension(document).to_string(),
        }
    }

    /// Extracts the first `[[target]]` token from arbitrary header text.
    ///
    /// Returns `None` if there is no token or if it names nothing (`[[]]`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let target = LINK_PATTERN.captures(text)?.get(1)?.as_str().trim();
        if target.is_empty() {
            return None;
        }
        Some(Self {
            target: target.to_string(),
        })
    }

    /// The base name of the linked document.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}]]", self.target)
    }
}

impl FromStr for Link {
    type Err = ParseLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseLinkError(s.to_string()))
    }
}

/// Error returned when text contains no `[[target]]` link.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("no [[link]] found in '{0}'")]
pub struct ParseLinkError(String);

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("[[chapter-one]]", Some("chapter-one"); "bare")]
    #[test_case("\"[[chapter-one]]\"", Some("chapter-one"); "legacy quoted")]
    #[test_case("see [[a]] and [[b]]", Some("a"); "first wins")]
    #[test_case("[[ spaced ]]", Some("spaced"); "trimmed")]
    #[test_case("[[]]", None; "empty target")]
    #[test_case("", None; "empty")]
    #[test_case("chapter-one", None; "no brackets")]
    #[test_case("[chapter-one]", None; "single brackets")]
    fn parse(text: &str, expected: Option<&str>) {
        assert_eq!(Link::parse(text).as_ref().map(Link::target), expected);
    }

    #[test]
    fn formats_as_wiki_link() {
        assert_eq!(Link::to("scene-two.md").to_string(), "[[scene-two]]");
        assert_eq!(Link::to("scene-two").to_string(), "[[scene-two]]");
    }

    #[test]
    fn format_then_parse_recovers_target() {
        let link = Link::to("the-end.md");
        assert_eq!(link.to_string().parse::<Link>().unwrap(), link);
    }

    #[test]
    fn from_str_rejects_plain_text() {
        assert!("nothing here".parse::<Link>().is_err());
    }
}
