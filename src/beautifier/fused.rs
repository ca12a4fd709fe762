//! Splits keyword-fused minified text (`localx`, `ifx>1thena=2end`) back
//! into separate tokens. Three families of splits, from most to least
//! certain: keyword-keyword pairs, the "safe" keywords that never appear as
//! identifier fragments in this obfuscator's output, and structural
//! keywords that only split off a single trailing character.

use lazy_static::lazy_static;
use regex::Regex;

pub const KEYWORDS: [&str; 20] = [
    "local", "function", "if", "while", "for", "repeat", "do", "then", "else", "elseif", "end",
    "until", "return", "not", "and", "or", "nil", "true", "false", "in",
];

/// Keywords aggressive enough to split away from any adjacent identifier
/// character.
pub const SAFE_KEYWORDS: [&str; 7] =
    ["local", "function", "return", "not", "nil", "true", "false"];

/// Keywords that commonly collide with identifier text (`do` in `down`,
/// `or` in `color`). Split only when the remainder is a single character.
pub const STRUCTURAL_KEYWORDS: [&str; 13] = [
    "if", "for", "while", "repeat", "and", "or", "do", "then", "end", "until", "else", "elseif",
    "in",
];

lazy_static! {
    static ref DIGIT_LETTER_RE: Regex =
        Regex::new(r"([0-9])([A-Za-z_])").expect("digit-letter pattern");
    static ref PAIR_SPLITS: Vec<(String, Regex)> = {
        let mut splits = Vec::with_capacity(KEYWORDS.len() * KEYWORDS.len());
        for k1 in KEYWORDS {
            for k2 in KEYWORDS {
                let fused = format!("{k1}{k2}");
                let re = Regex::new(&format!(r"\b({k1})({k2})\b")).expect("pair pattern");
                splits.push((fused, re));
            }
        }
        splits
    };
    static ref SAFE_SPLITS: Vec<Regex> = {
        let mut splits = Vec::with_capacity(SAFE_KEYWORDS.len() * 2);
        for kw in SAFE_KEYWORDS {
            splits.push(Regex::new(&format!(r"\b({kw})([A-Za-z_])")).expect("safe pattern"));
            splits.push(Regex::new(&format!(r"([A-Za-z_])({kw})\b")).expect("safe pattern"));
        }
        splits
    };
    static ref STRUCTURAL_SPLITS: Vec<Regex> = {
        STRUCTURAL_KEYWORDS
            .iter()
            .map(|kw| {
                Regex::new(&format!(r"\b({kw})([A-Za-z_])\b")).expect("structural pattern")
            })
            .collect()
    };
    static ref KEYWORD_DIGIT_SPLITS: Vec<Regex> = {
        KEYWORDS
            .iter()
            .map(|kw| Regex::new(&format!(r"\b({kw})([0-9])")).expect("keyword-digit pattern"))
            .collect()
    };
}

/// One full de-fusing pass over marker-shielded code. Two rounds of the
/// keyword splits, because a split from a later family can expose a pair
/// fusion that the earlier family already passed over.
pub fn expand_fused(text: &str) -> String {
    let mut current = DIGIT_LETTER_RE.replace_all(text, "$1 $2").into_owned();

    for _ in 0..2 {
        for (fused, re) in PAIR_SPLITS.iter() {
            if current.contains(fused.as_str()) {
                current = re.replace_all(&current, "$1 $2").into_owned();
            }
        }
        for re in SAFE_SPLITS.iter() {
            current = re.replace_all(&current, "$1 $2").into_owned();
        }
        for re in STRUCTURAL_SPLITS.iter() {
            current = re.replace_all(&current, "$1 $2").into_owned();
        }
    }

    for re in KEYWORD_DIGIT_SPLITS.iter() {
        current = re.replace_all(&current, "$1 $2").into_owned();
    }

    current
}
