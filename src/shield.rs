use crate::span::Span;
use crate::tokenizer::Tokenizer;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref MARKER_RE: Regex = Regex::new(r"@LIT(\d+)@").expect("marker pattern");
}

/// Reversible protection of string/comment spans behind opaque markers, so
/// whole-text rewriting can run on the remaining code without corrupting
/// literal content.
///
/// The marker shape `@LIT<n>@` is chosen so no folding or beautification
/// rewrite can split it: it contains no operator characters, no keyword, and
/// no digit directly followed by an identifier character.
pub struct Shield {
    saved: Vec<String>,
}

impl Shield {
    /// Builds the working text from a span list, replacing every protected
    /// span with a fresh marker.
    pub fn protect(spans: &[Span]) -> (String, Self) {
        let mut working = String::new();
        let mut saved = Vec::new();

        for span in spans {
            if span.kind.is_protected() {
                working.push_str(&format!("@LIT{}@", saved.len()));
                saved.push(span.text.clone());
            } else {
                working.push_str(&span.text);
            }
        }

        (working, Self { saved })
    }

    /// Tokenizes `code` and protects its literals in one step.
    pub fn protect_source(code: &str) -> (String, Self) {
        let spans = Tokenizer::new(code).tokenize();
        Self::protect(&spans)
    }

    /// Restores every marker to its original text. Each saved literal is
    /// restored exactly once; an unknown marker id is left as-is.
    pub fn restore(&self, text: &str) -> String {
        let mut restored = 0usize;
        let out = MARKER_RE
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|id| self.saved.get(id))
                    .map_or_else(
                        || caps[0].to_string(),
                        |original| {
                            restored += 1;
                            original.clone()
                        },
                    )
            })
            .into_owned();

        debug_assert_eq!(
            restored,
            self.saved.len(),
            "Every marker must be restored exactly once"
        );

        out
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protect_and_restore_roundtrip() {
        let code = "print(\"a + b\") -- 1 + 2\nx = 1";
        let (working, shield) = Shield::protect_source(code);

        assert!(working.contains("@LIT0@"), "String should become a marker");
        assert!(working.contains("@LIT1@"), "Comment should become a marker");
        assert!(
            !working.contains("a + b"),
            "Literal text must not leak into the working text"
        );

        assert_eq!(shield.restore(&working), code);
    }

    #[test]
    fn test_rewriting_between_protect_and_restore() {
        let code = "y = \"2 * 3\"";
        let (working, shield) = Shield::protect_source(code);

        let rewritten = working.replace("y =", "local y =");
        assert_eq!(shield.restore(&rewritten), "local y = \"2 * 3\"");
    }

    #[test]
    fn test_no_literals_means_no_markers() {
        let (working, shield) = Shield::protect_source("a = b + c");
        assert!(shield.is_empty());
        assert_eq!(working, "a = b + c");
        assert_eq!(shield.restore(&working), "a = b + c");
    }
}
