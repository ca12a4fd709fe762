//! Replaces decoder call sites with the recovered string literals.

use regex::{Captures, Regex};
use rustc_hash::FxHashMap;

/// Rewrites every `name(<offset>)` whose offset decoded successfully into a
/// quoted, escaped literal. Calls whose offset is missing from `decoded`
/// stay untouched so a failed decode remains visible in the output.
pub fn substitute_calls(
    code: &str,
    decoder_name: &str,
    decoded: &FxHashMap<usize, String>,
) -> String {
    let Ok(re) = Regex::new(&format!(
        r"\b{}\s*\(\s*(\d+)\s*\)",
        regex::escape(decoder_name)
    )) else {
        return code.to_string();
    };

    re.replace_all(code, |caps: &Captures<'_>| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|offset| decoded.get(&offset))
            .map_or_else(
                || caps[0].to_string(),
                |text| format!("\"{}\"", escape_lua(text)),
            )
    })
    .into_owned()
}

/// Escapes a recovered string for inclusion in a double-quoted Lua literal.
fn escape_lua(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded_map(entries: &[(usize, &str)]) -> FxHashMap<usize, String> {
        entries
            .iter()
            .map(|&(k, v)| (k, v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_known_offsets() {
        let decoded = decoded_map(&[(0, "Hello"), (16, "world")]);
        let out = substitute_calls("print(m(0) .. m(16))", "m", &decoded);
        assert_eq!(out, "print(\"Hello\" .. \"world\")");
    }

    #[test]
    fn test_unknown_offset_left_in_place() {
        let decoded = decoded_map(&[(0, "ok")]);
        let out = substitute_calls("print(m(0)) print(m(500))", "m", &decoded);
        assert_eq!(out, "print(\"ok\") print(m(500))");
    }

    #[test]
    fn test_other_functions_untouched() {
        let decoded = decoded_map(&[(1, "x")]);
        let out = substitute_calls("mm(1) m(1) am(1)", "m", &decoded);
        assert_eq!(out, "mm(1) \"x\" am(1)");
    }

    #[test]
    fn test_escaping_special_characters() {
        let decoded = decoded_map(&[(0, "a\"b\\c\nd")]);
        let out = substitute_calls("m(0)", "m", &decoded);
        assert_eq!(out, "\"a\\\"b\\\\c\\nd\"");
    }
}
