//! Structural beautifier for minified Lua. Strings and comments are shielded
//! behind markers for the whole run, so operator spacing, keyword de-fusing,
//! statement splitting, and re-indentation only ever touch code.

mod fused;
mod indent;

pub use fused::expand_fused;

use crate::options::Options;
use crate::shield::Shield;
use lazy_static::lazy_static;
use regex::Regex;

const SPLIT_STARTS: [&str; 9] = [
    "local", "if", "while", "for", "repeat", "return", "function", "end", "until",
];
const SPLIT_MIDDLES: [&str; 4] = ["then", "do", "else", "elseif"];

lazy_static! {
    static ref START_SPLITS: Vec<Regex> = SPLIT_STARTS
        .iter()
        .map(|kw| Regex::new(&format!(r"\s*\b({kw})\b")).expect("start split pattern"))
        .collect();
    static ref MIDDLE_SPLITS: Vec<Regex> = SPLIT_MIDDLES
        .iter()
        .map(|kw| Regex::new(&format!(r"\b({kw})\b\s*")).expect("middle split pattern"))
        .collect();
    static ref FIELD_RE: Regex =
        Regex::new(r"([A-Za-z0-9_])\s*\.\s*([A-Za-z_])").expect("field access pattern");
    static ref DECIMAL_RE: Regex =
        Regex::new(r"(\d)\s*\.\s*(\d)").expect("decimal pattern");
    static ref SPACE_RUN_RE: Regex = Regex::new(r" +").expect("space run pattern");
}

/// Formats one chunk of (possibly minified) Lua source.
pub fn beautify(code: &str, options: &Options) -> String {
    let (working, shield) = Shield::protect_source(code);

    let mut text = space_operators(&working);
    text = normalize_punctuation(&text);
    text = expand_fused(&text);
    text = split_statements(&text);
    text = SPACE_RUN_RE.replace_all(&text, " ").into_owned();
    text = indent::reindent(&text, options);

    shield.restore(&text)
}

/// Pads every operator with spaces. Multi-character operators go through
/// placeholders first so the single-character pass cannot split them.
fn space_operators(text: &str) -> String {
    let mut out = text
        .replace("...", " ___DOT3___ ")
        .replace("==", " ___EQ___ ")
        .replace("~=", " ___NE___ ")
        .replace("<=", " ___LE___ ")
        .replace(">=", " ___GE___ ")
        .replace("..", " ___DOT2___ ");

    for op in ['=', '+', '-', '*', '/', '%', '^', '#', '<', '>'] {
        out = out.replace(op, &format!(" {op} "));
    }

    out.replace(" ___DOT3___ ", " ... ")
        .replace(" ___DOT2___ ", " .. ")
        .replace(" ___EQ___ ", " == ")
        .replace(" ___NE___ ", " ~= ")
        .replace(" ___LE___ ", " <= ")
        .replace(" ___GE___ ", " >= ")
}

/// Rejoins field access and decimal literals that spacing pulled apart, and
/// puts a space after every comma.
fn normalize_punctuation(text: &str) -> String {
    let out = FIELD_RE.replace_all(text, "$1.$2");
    let out = DECIMAL_RE.replace_all(&out, "$1.$2");
    out.replace(',', ", ")
}

/// One statement per line: block-starting keywords get a leading newline,
/// header-closing keywords a trailing one. `local function` is re-joined
/// afterwards since both halves split independently.
fn split_statements(text: &str) -> String {
    let mut out = text.to_string();

    for re in START_SPLITS.iter() {
        out = re.replace_all(&out, "\n$1").into_owned();
    }
    for re in MIDDLE_SPLITS.iter() {
        out = re.replace_all(&out, "$1\n").into_owned();
    }

    out.replace("local\nfunction", "local function")
        .replace(';', ";\n")
}
