//! Line-based re-indentation after statement splitting. Tracks a single
//! nesting level: block openers indent the following lines, block closers
//! dedent their own line first.

use crate::options::Options;

const DEDENT_STARTS: [&str; 6] = ["end", "until", "else", "elseif", "do", "then"];
const INDENT_ENDS: [&str; 4] = ["do", "then", "else", "elseif"];

pub fn reindent(text: &str, options: &Options) -> String {
    let step = options.indent_char.repeat(options.indent_size);
    let mut level = 0usize;
    let mut out: Vec<String> = Vec::new();

    for raw in text.lines() {
        let clean = raw.trim();
        if clean.is_empty() {
            continue;
        }

        if dedents(clean) {
            level = level.saturating_sub(1);
        }
        out.push(format!("{}{}", step.repeat(level), clean));
        if indents_after(clean) {
            level += 1;
        }
    }

    out.join("\n")
}

fn dedents(line: &str) -> bool {
    if line.starts_with('}') {
        return true;
    }
    DEDENT_STARTS.iter().any(|tok| {
        if !starts_with_token(line, tok) {
            return false;
        }
        // "do" or "then" opening a line closes the header of a loop split
        // across lines; a full header on one line never dedents itself.
        if matches!(*tok, "do" | "then") && (line.contains("while") || line.contains("for")) {
            return false;
        }
        true
    })
}

fn indents_after(line: &str) -> bool {
    if line.ends_with('{') {
        return true;
    }
    if INDENT_ENDS.iter().any(|tok| ends_with_token(line, tok)) {
        return true;
    }
    opens_function(line) && !ends_with_token(line, "end")
}

fn opens_function(line: &str) -> bool {
    if starts_with_token(line, "function") {
        return true;
    }
    line.strip_prefix("local")
        .is_some_and(|rest| starts_with_token(rest.trim_start(), "function"))
}

fn starts_with_token(line: &str, token: &str) -> bool {
    line.strip_prefix(token)
        .is_some_and(|rest| !rest.starts_with(is_ident_char))
}

fn ends_with_token(line: &str, token: &str) -> bool {
    line.strip_suffix(token).is_some_and(|rest| {
        rest.chars().next_back().is_none_or(|c| !is_ident_char(c))
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_block_indentation() {
        let text = "if x > 1 then\na = 2\nend";
        let expected = "if x > 1 then\n    a = 2\nend";
        assert_eq!(reindent(text, &Options::default()), expected);
    }

    #[test]
    fn test_nested_blocks() {
        let text = "while x do\nif y then\nz = 1\nend\nend";
        let expected = "while x do\n    if y then\n        z = 1\n    end\nend";
        assert_eq!(reindent(text, &Options::default()), expected);
    }

    #[test]
    fn test_else_dedents_then_indents() {
        let text = "if x then\na = 1\nelse\na = 2\nend";
        let expected = "if x then\n    a = 1\nelse\n    a = 2\nend";
        assert_eq!(reindent(text, &Options::default()), expected);
    }

    #[test]
    fn test_function_body_indents() {
        let text = "function m(p)\nreturn p\nend";
        let expected = "function m(p)\n    return p\nend";
        assert_eq!(reindent(text, &Options::default()), expected);
    }

    #[test]
    fn test_identifier_prefix_is_not_a_token() {
        // "ending" starts with "end" but must not dedent.
        let text = "if x then\nending = 1\nend";
        let expected = "if x then\n    ending = 1\nend";
        assert_eq!(reindent(text, &Options::default()), expected);
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        let text = "a = 1\n\n\nb = 2";
        assert_eq!(reindent(text, &Options::default()), "a = 1\nb = 2");
    }

    #[test]
    fn test_excess_closers_never_underflow() {
        assert_eq!(reindent("end\nend\nx = 1", &Options::default()), "end\nend\nx = 1");
    }

    #[test]
    fn test_custom_indent() {
        let options = Options {
            indent_size: 1,
            indent_char: "\t".to_string(),
            ..Options::default()
        };
        assert_eq!(
            reindent("if x then\na = 1\nend", &options),
            "if x then\n\ta = 1\nend"
        );
    }
}
