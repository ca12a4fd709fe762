use crate::span::{Span, SpanKind};

/// Partitions raw Lua source into code, string, and comment spans so that
/// later rewriting passes never corrupt literal content.
///
/// Recognition order at every position: long-bracket literal (`[[`, `[=[`,
/// ..., optionally preceded by `--`), line comment, quoted string, code run.
/// Unterminated literals swallow to end of input instead of erroring.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn tokenize(&mut self) -> Vec<Span> {
        let mut spans = Vec::new();

        while self.pos < self.input.len() {
            if let Some(span) = self.read_long_bracket() {
                spans.push(span);
                continue;
            }

            if self.rest().starts_with("--") {
                spans.push(self.read_line_comment());
                continue;
            }

            let b = self.input.as_bytes()[self.pos];
            if b == b'"' || b == b'\'' {
                spans.push(self.read_quoted_string(b));
                continue;
            }

            spans.push(self.read_code());
        }

        debug_assert_eq!(
            spans.iter().map(|s| s.text.len()).sum::<usize>(),
            self.input.len(),
            "Spans must cover the input with no gaps"
        );

        spans
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    /// `[=*[` ... `]=*]` with a matching equals-count, as a string literal or
    /// (with a `--` prefix) a block comment. Returns `None` when the current
    /// position is not a well-formed opener.
    fn read_long_bracket(&mut self) -> Option<Span> {
        let start = self.pos;
        let rest = self.rest();

        let (is_comment, body) = match rest.strip_prefix("--") {
            Some(after) => (true, after),
            None => (false, rest),
        };

        let mut bytes = body.bytes();
        if bytes.next() != Some(b'[') {
            return None;
        }
        let mut equals = 0usize;
        let mut next = bytes.next();
        while next == Some(b'=') {
            equals += 1;
            next = bytes.next();
        }
        if next != Some(b'[') {
            return None;
        }

        let opener_len = usize::from(is_comment) * 2 + 2 + equals;
        let closer = format!("]{}]", "=".repeat(equals));
        let search_from = start + opener_len;

        // No closer: the opener swallows everything to end of input.
        let end = self.input[search_from..]
            .find(&closer)
            .map_or(self.input.len(), |i| search_from + i + closer.len());

        self.pos = end;
        let kind = if is_comment {
            SpanKind::Comment
        } else {
            SpanKind::StringLiteral
        };
        Some(Span::new(kind, &self.input[start..end], start))
    }

    fn read_line_comment(&mut self) -> Span {
        let start = self.pos;
        let end = self.rest().find('\n').map_or(self.input.len(), |i| start + i);
        self.pos = end;
        Span::new(SpanKind::Comment, &self.input[start..end], start)
    }

    fn read_quoted_string(&mut self, quote: u8) -> Span {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut i = start + 1;

        while i < bytes.len() {
            if bytes[i] == quote && bytes[i - 1] != b'\\' {
                break;
            }
            i += 1;
        }

        // Unterminated strings swallow to end of input.
        let end = if i < bytes.len() { i + 1 } else { bytes.len() };
        self.pos = end;
        Span::new(SpanKind::StringLiteral, &self.input[start..end], start)
    }

    fn read_code(&mut self) -> Span {
        let start = self.pos;
        let bytes = self.input.as_bytes();

        // Always consume the current character, so a `[` or `[=` that failed
        // the long-bracket check cannot stall the scan.
        let first_len = self
            .rest()
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        let mut i = start + first_len;

        while i < bytes.len() {
            let b = bytes[i];
            if b == b'"' || b == b'\'' {
                break;
            }
            if b == b'-' && bytes.get(i + 1).copied() == Some(b'-') {
                break;
            }
            if b == b'[' && matches!(bytes.get(i + 1).copied(), Some(b'[' | b'=')) {
                break;
            }
            i += 1;
        }

        self.pos = i;
        Span::new(SpanKind::Code, &self.input[start..i], start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> Vec<Span> {
        let spans = Tokenizer::new(input).tokenize();
        let rebuilt: String = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(rebuilt, input, "Concatenated spans must reproduce input");
        spans
    }

    #[test]
    fn test_plain_code_is_one_span() {
        let spans = roundtrip("local x = 1 + 2");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, SpanKind::Code);
    }

    #[test]
    fn test_string_and_comment_spans() {
        let spans = roundtrip("local s = \"hi\" -- note\nx = 1");
        let kinds: Vec<SpanKind> = spans.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SpanKind::Code,
                SpanKind::StringLiteral,
                SpanKind::Code,
                SpanKind::Comment,
                SpanKind::Code,
            ]
        );
        assert_eq!(spans[1].text, "\"hi\"");
        assert_eq!(spans[3].text, "-- note");
    }

    #[test]
    fn test_long_bracket_string() {
        let spans = roundtrip("x = [[a\nb]] .. y");
        assert_eq!(spans[1].kind, SpanKind::StringLiteral);
        assert_eq!(spans[1].text, "[[a\nb]]");
    }

    #[test]
    fn test_long_bracket_comment_with_equals() {
        let spans = roundtrip("--[==[ block ]==] z = 1");
        assert_eq!(spans[0].kind, SpanKind::Comment);
        assert_eq!(spans[0].text, "--[==[ block ]==]");
    }

    #[test]
    fn test_nested_level_closer_is_ignored() {
        // The ]] inside does not close a [=[ literal.
        let spans = roundtrip("s = [=[ a ]] b ]=]");
        assert_eq!(spans[1].text, "[=[ a ]] b ]=]");
    }

    #[test]
    fn test_escaped_quote_stays_inside_string() {
        let spans = roundtrip(r#"s = "a\"b" + 1"#);
        assert_eq!(spans[1].text, r#""a\"b""#);
    }

    #[test]
    fn test_single_quoted_string() {
        let spans = roundtrip("s = 'it'..x");
        assert_eq!(spans[1].kind, SpanKind::StringLiteral);
        assert_eq!(spans[1].text, "'it'");
    }

    #[test]
    fn test_unterminated_string_swallows_to_eof() {
        let spans = roundtrip("s = \"abc");
        assert_eq!(spans.last().map(|s| s.kind), Some(SpanKind::StringLiteral));
        assert_eq!(spans.last().map(|s| s.text.as_str()), Some("\"abc"));
    }

    #[test]
    fn test_unterminated_long_bracket_swallows_to_eof() {
        let spans = roundtrip("x = 1 [[never closed");
        assert_eq!(spans.last().map(|s| s.kind), Some(SpanKind::StringLiteral));
    }

    #[test]
    fn test_comment_excludes_newline() {
        let spans = roundtrip("-- c\nx");
        assert_eq!(spans[0].text, "-- c");
        assert_eq!(spans[1].text, "\nx");
    }

    #[test]
    fn test_false_long_bracket_opener_is_code() {
        // `[=` that is not followed by `[` is ordinary code (table index).
        let spans = roundtrip("t[1]=2 u[i]=3");
        assert!(spans.iter().all(|s| s.kind == SpanKind::Code));
    }
}
