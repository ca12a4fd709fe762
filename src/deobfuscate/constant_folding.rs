//! Iterative constant folding over shielded source text.
//!
//! Obfuscated scripts bury every numeric constant under layers of arithmetic
//! (`(0x1F + 3) * 2 - 1`). Each pass collapses parenthesized numeric groups,
//! whitelisted math calls, and bare binary runs, until a fixed point or the
//! iteration cap is reached. Strings and comments are shielded behind markers
//! for the duration, so no literal content is ever rewritten.

use crate::shield::Shield;
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashMap;

lazy_static! {
    static ref ALIAS_RE: Regex =
        Regex::new(r"local\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*math\.(floor|ceil|abs|sqrt)")
            .expect("alias pattern");
    static ref PAREN_RE: Regex =
        Regex::new(r"\(\s*([0-9a-fA-Fx\.\s\+\-\*/%\^]+)\s*\)").expect("paren group pattern");
    static ref BINARY_RUN_RE: Regex = Regex::new(
        r"[+-]?\s*(?:0x[0-9a-fA-F]+|\d+(?:\.\d*)?)(?:\s*[\+\-\*/%\^]\s*[+-]?\s*(?:0x[0-9a-fA-F]+|\d+(?:\.\d*)?))+"
    )
    .expect("binary run pattern");
    static ref FLAT_PAREN_RE: Regex = Regex::new(
        r"\(\s*([\-\+]?\s*\d+\.?\d*(?:\s*[\+\-\*/%\^]\s*[\-\+]?\s*\d+\.?\d*)*)\s*\)"
    )
    .expect("flat paren pattern");
    static ref FLAT_RUN_RE: Regex =
        Regex::new(r"[\-\+]?\s*\d+\.?\d*(?:\s*[\+\-\*/%\^]\s*[\-\+]?\s*\d+\.?\d*)+")
            .expect("flat run pattern");
    static ref SPACE_RUN_RE: Regex = Regex::new(r" +").expect("space run pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Floor,
    Ceil,
    Abs,
    Sqrt,
}

impl MathFn {
    fn from_suffix(name: &str) -> Option<Self> {
        match name {
            "floor" => Some(Self::Floor),
            "ceil" => Some(Self::Ceil),
            "abs" => Some(Self::Abs),
            "sqrt" => Some(Self::Sqrt),
            _ => None,
        }
    }

    fn apply(self, value: f64) -> f64 {
        match self {
            Self::Floor => value.floor(),
            Self::Ceil => value.ceil(),
            Self::Abs => value.abs(),
            Self::Sqrt => value.sqrt(),
        }
    }
}

/// Locally declared shorthands for the whitelisted math functions, collected
/// from `local <name> = math.<fn>` declarations. Read-only after the scan.
pub type AliasTable = FxHashMap<String, MathFn>;

pub fn find_math_aliases(code: &str) -> AliasTable {
    let mut table = AliasTable::default();
    for caps in ALIAS_RE.captures_iter(code) {
        if let Some(func) = MathFn::from_suffix(&caps[2]) {
            table.insert(caps[1].to_string(), func);
        }
    }
    table
}

/// Full-file folding pass used by the pipeline. Shields literals, iterates
/// the three reductions to a fixed point (or `max_passes`), collapses space
/// runs, and restores the literals.
pub fn fold_constants(code: &str, max_passes: usize) -> String {
    let aliases = find_math_aliases(code);
    let call_patterns = build_call_patterns(&aliases);
    let (working, shield) = Shield::protect_source(code);

    let mut current = working;
    for _ in 0..max_passes {
        let mut next = fold_parens(&current, &PAREN_RE, &aliases);
        next = fold_math_calls(&next, &call_patterns, &aliases);
        next = fold_binary_runs(&next, &aliases);

        if next == current {
            break;
        }
        current = next;
    }

    shield.restore(&cleanup_spacing(&current))
}

/// Standalone flat folder: only fully-parenthesized numeric groups and flat
/// sequences bounded by safe delimiters. No shielding, no math functions.
pub fn fold_flat(text: &str, max_passes: usize) -> String {
    let aliases = AliasTable::default();

    let mut current = text.to_string();
    for _ in 0..max_passes {
        let mut next = fold_parens(&current, &FLAT_PAREN_RE, &aliases);
        next = fold_flat_runs(&next, &aliases);

        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn build_call_patterns(aliases: &AliasTable) -> Vec<(MathFn, Regex)> {
    let canonical = [
        ("math.floor", MathFn::Floor),
        ("math.ceil", MathFn::Ceil),
        ("math.abs", MathFn::Abs),
        ("math.sqrt", MathFn::Sqrt),
    ];

    let mut patterns = Vec::new();
    for (name, func) in canonical {
        if let Some(re) = call_pattern(name) {
            patterns.push((func, re));
        }
    }
    for (alias, func) in aliases {
        if let Some(re) = call_pattern(alias) {
            patterns.push((*func, re));
        }
    }
    patterns
}

fn call_pattern(name: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"\b{}\s*\(\s*([0-9a-fA-Fx\.\s\+\-\*/%\^]+)\s*\)",
        regex::escape(name)
    ))
    .ok()
}

/// Innermost parenthesized numeric groups. A group immediately preceded by an
/// identifier character is a call argument: its parentheses are kept.
fn fold_parens(text: &str, pattern: &Regex, aliases: &AliasTable) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(group)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(value) = ExprParser::evaluate(group.as_str(), aliases) else {
            continue;
        };

        let preceded_by_ident = text[..whole.start()]
            .trim_end()
            .chars()
            .last()
            .is_some_and(is_ident_char);

        out.push_str(&text[last..whole.start()]);
        let rendered = format_number(value);
        if preceded_by_ident {
            out.push('(');
            out.push_str(&rendered);
            out.push(')');
        } else {
            out.push(' ');
            out.push_str(&rendered);
            out.push(' ');
        }
        last = whole.end();
    }

    out.push_str(&text[last..]);
    out
}

fn fold_math_calls(text: &str, patterns: &[(MathFn, Regex)], aliases: &AliasTable) -> String {
    let mut current = text.to_string();

    for (func, re) in patterns {
        if !re.is_match(&current) {
            continue;
        }
        current = re
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                ExprParser::evaluate(&caps[1], aliases).map_or_else(
                    || caps[0].to_string(),
                    |arg| format!(" {} ", format_number(func.apply(arg))),
                )
            })
            .into_owned();
    }

    current
}

/// Maximal runs of binary arithmetic between bare numeric literals. A run
/// touching an identifier character on the left, or a digit/hex/dot on the
/// right, is part of a larger expression and must not be folded.
fn fold_binary_runs(text: &str, aliases: &AliasTable) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    let mut search = 0usize;

    while let Some(m) = BINARY_RUN_RE.find_at(text, search) {
        let left_ok = m.start() == 0 || !is_ident_byte(bytes[m.start() - 1]);
        let right_ok = bytes
            .get(m.end())
            .is_none_or(|&b| !(b.is_ascii_hexdigit() || b == b'x' || b == b'.'));

        if left_ok && right_ok {
            if let Some(value) = ExprParser::evaluate(m.as_str(), aliases) {
                out.push_str(&text[last..m.start()]);
                out.push(' ');
                out.push_str(&format_number(value));
                out.push(' ');
                last = m.end();
                search = m.end();
                continue;
            }
        }

        search = m.start() + 1;
        if search >= text.len() {
            break;
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Flat sequences must sit between safe delimiters so that no part of a
/// larger chain (`x + 1`, `% 4 + 1`) is ever folded.
fn fold_flat_runs(text: &str, aliases: &AliasTable) -> String {
    const SAFE_PRE: &[u8] = b"=(,[{;\n\r";
    const SAFE_POST: &[u8] = b"),;\n\r]}";

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    let mut search = 0usize;

    while let Some(m) = FLAT_RUN_RE.find_at(text, search) {
        let mut left = m.start();
        while left > 0 && matches!(bytes[left - 1], b' ' | b'\t') {
            left -= 1;
        }
        let left_ok = left == 0 || SAFE_PRE.contains(&bytes[left - 1]);

        let mut right = m.end();
        while right < bytes.len() && matches!(bytes[right], b' ' | b'\t') {
            right += 1;
        }
        let right_ok = right == bytes.len() || SAFE_POST.contains(&bytes[right]);

        if left_ok && right_ok {
            if let Some(value) = ExprParser::evaluate(m.as_str(), aliases) {
                out.push_str(&text[last..m.start()]);
                out.push(' ');
                out.push_str(&format_number(value));
                out.push(' ');
                last = m.end();
                search = m.end();
                continue;
            }
        }

        search = m.start() + 1;
        if search >= text.len() {
            break;
        }
    }

    out.push_str(&text[last..]);
    out
}

fn cleanup_spacing(text: &str) -> String {
    text.lines()
        .map(|line| SPACE_RUN_RE.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Integral values render as bare integers regardless of magnitude;
/// fractional values render fixed with trailing zeros trimmed; fractional
/// extremes fall back to scientific notation.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        let rendered = format!("{value:.0}");
        return if rendered == "-0" {
            "0".to_string()
        } else {
            rendered
        };
    }
    if value.abs() < 1e12 && value.abs() > 1e-8 {
        let fixed = format!("{value:.15}");
        return fixed.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{value:e}")
}

/// Recursive-descent evaluator for candidate expressions. Understands
/// decimal and hex numerals, `+ - * / % ^` (Lua precedence: `^` is
/// right-associative and binds tighter than unary minus), parentheses, and
/// the whitelisted math functions resolved through the alias table. Any
/// other identifier makes the expression unsafe and aborts the evaluation,
/// so free variables are never touched.
struct ExprParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    aliases: &'a AliasTable,
}

impl<'a> ExprParser<'a> {
    fn evaluate(expr: &'a str, aliases: &'a AliasTable) -> Option<f64> {
        let mut parser = Self {
            bytes: expr.as_bytes(),
            pos: 0,
            aliases,
        };
        let value = parser.expr()?;
        parser.skip_ws();
        if parser.pos < parser.bytes.len() || !value.is_finite() {
            return None;
        }
        Some(value)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Some(value),
            }
        }
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.unary()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return None;
                    }
                    value /= divisor;
                }
                Some(b'%') => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return None;
                    }
                    value = floored_rem(value, divisor);
                }
                _ => return Some(value),
            }
        }
    }

    fn unary(&mut self) -> Option<f64> {
        self.skip_ws();
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Some(-self.unary()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Option<f64> {
        let base = self.atom()?;
        self.skip_ws();
        if self.peek() == Some(b'^') {
            self.pos += 1;
            let exponent = self.unary()?;
            return Some(base.powf(exponent));
        }
        Some(base)
    }

    fn atom(&mut self) -> Option<f64> {
        self.skip_ws();
        match self.peek()? {
            b'(' => {
                self.pos += 1;
                let value = self.expr()?;
                self.skip_ws();
                if self.peek() != Some(b')') {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            b'0'..=b'9' => self.number(),
            b if b == b'_' || b.is_ascii_alphabetic() => self.call(),
            _ => None,
        }
    }

    fn number(&mut self) -> Option<f64> {
        if self.peek() == Some(b'0')
            && matches!(self.bytes.get(self.pos + 1).copied(), Some(b'x' | b'X'))
        {
            let start = self.pos + 2;
            let mut end = start;
            while self
                .bytes
                .get(end)
                .is_some_and(|b| b.is_ascii_hexdigit())
            {
                end += 1;
            }
            if end == start {
                return None;
            }
            let digits = std::str::from_utf8(&self.bytes[start..end]).ok()?;
            let value = i64::from_str_radix(digits, 16).ok()?;
            self.pos = end;
            return Some(value as f64);
        }

        let start = self.pos;
        let mut end = start;
        while self.bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if self.bytes.get(end).copied() == Some(b'.') {
            end += 1;
            while self.bytes.get(end).is_some_and(u8::is_ascii_digit) {
                end += 1;
            }
        }

        let literal = std::str::from_utf8(&self.bytes[start..end]).ok()?;
        let value = literal.parse::<f64>().ok()?;
        self.pos = end;
        Some(value)
    }

    fn call(&mut self) -> Option<f64> {
        let start = self.pos;
        let mut end = start;
        while self
            .bytes
            .get(end)
            .is_some_and(|&b| b == b'_' || b == b'.' || b.is_ascii_alphanumeric())
        {
            end += 1;
        }

        let name = std::str::from_utf8(&self.bytes[start..end]).ok()?;
        let func = match name.strip_prefix("math.").and_then(MathFn::from_suffix) {
            Some(func) => func,
            None => *self.aliases.get(name)?,
        };
        self.pos = end;

        self.skip_ws();
        if self.peek() != Some(b'(') {
            return None;
        }
        self.pos += 1;
        let argument = self.expr()?;
        self.skip_ws();
        if self.peek() != Some(b')') {
            return None;
        }
        self.pos += 1;

        Some(func.apply(argument))
    }
}

/// Lua's `%` is floored; Rust's truncates, so negatives need the long form.
fn floored_rem(a: f64, b: f64) -> f64 {
    a - (a / b).floor() * b
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 150;

    #[test]
    fn test_fold_binary_run() {
        assert_eq!(fold_constants("local a = 1 + 2 * 3", CAP), "local a = 7");
    }

    #[test]
    fn test_fold_paren_group_then_run() {
        assert_eq!(fold_constants("x = (2 + 3) * 4", CAP), "x = 20");
    }

    #[test]
    fn test_fold_hex_literals() {
        assert_eq!(fold_constants("x = 0x10 + 2", CAP), "x = 18");
    }

    #[test]
    fn test_call_argument_keeps_parentheses() {
        let folded = fold_constants("m(2 + 3)", CAP);
        assert_eq!(folded, "m(5)", "Call arguments must stay parenthesized");
    }

    #[test]
    fn test_bare_call_argument_untouched() {
        assert_eq!(fold_constants("m(123)", CAP), "m(123)");
    }

    #[test]
    fn test_free_identifier_is_never_folded() {
        assert_eq!(fold_constants("x + 1", CAP), "x + 1");
        assert_eq!(fold_constants("y = (a + b)", CAP), "y = (a + b)");
    }

    #[test]
    fn test_strings_and_comments_are_shielded() {
        let code = "s = \"1 + 2\" -- 3 + 4";
        assert_eq!(fold_constants(code, CAP), code);
    }

    #[test]
    fn test_math_alias_resolution() {
        let code = "local fl = math.floor\ny = fl(3.7)";
        let folded = fold_constants(code, CAP);
        assert!(folded.contains("y = 3"), "Alias call should fold, got: {folded}");
    }

    #[test]
    fn test_canonical_math_call() {
        let folded = fold_constants("y = math.ceil(1.2) + math.abs(0 - 4)", CAP);
        assert!(folded.contains("y = 6"), "Should fold to 6, got: {folded}");
    }

    #[test]
    fn test_fractional_formatting() {
        assert_eq!(fold_constants("x = 1 / 4", CAP), "x = 0.25");
    }

    #[test]
    fn test_power_is_right_associative_and_tight() {
        // Lua: -2^2 == -(2^2)
        assert_eq!(fold_constants("x = 0 - 2 ^ 2", CAP), "x = -4");
        assert_eq!(fold_constants("x = 2 ^ 3 ^ 2", CAP), "x = 512");
    }

    #[test]
    fn test_floored_modulo() {
        assert_eq!(fold_constants("x = -7 % 4", CAP), "x = 1");
    }

    #[test]
    fn test_division_by_zero_left_alone() {
        assert_eq!(fold_constants("x = 1 / 0", CAP), "x = 1 / 0");
    }

    #[test]
    fn test_folding_is_idempotent() {
        let once = fold_constants("a = (1 + 2) * (3 + 4) .. x + 1", CAP);
        let twice = fold_constants(&once, CAP);
        assert_eq!(once, twice, "Second run must be a fixed point");
    }

    #[test]
    fn test_fold_flat_paren_group() {
        let folded = fold_flat("x = (1 + 2)", 50);
        assert!(folded.contains('3'), "Should fold, got: {folded}");
        assert!(!folded.contains("1 + 2"));
    }

    #[test]
    fn test_fold_flat_delimited_sequence() {
        let folded = fold_flat("y=1+2+3;", 50);
        assert!(folded.contains('6'), "Should fold, got: {folded}");
    }

    #[test]
    fn test_fold_flat_call_argument_keeps_parens() {
        assert_eq!(fold_flat("f(1+2)", 50), "f(3)");
    }

    #[test]
    fn test_fold_flat_leaves_open_chains() {
        assert_eq!(fold_flat("x + 1", 50), "x + 1");
        assert_eq!(fold_flat("(t - 1) % 4 + 1", 50), "(t - 1) % 4 + 1");
    }

    #[test]
    fn test_alias_table_scan() {
        let code = "local fl = math.floor local ce = math.ceil local x = other";
        let table = find_math_aliases(code);
        assert_eq!(table.get("fl"), Some(&MathFn::Floor));
        assert_eq!(table.get("ce"), Some(&MathFn::Ceil));
        assert_eq!(table.get("x"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_format_number_large_integrals_stay_bare() {
        assert_eq!(format_number(1.0e16), "10000000000000000");
        assert_eq!(format_number(1.0e20), "100000000000000000000");
    }
}
