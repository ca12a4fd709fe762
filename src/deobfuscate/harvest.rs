//! Locates the VM's artifacts inside the obfuscated source: the hex byte
//! pool, the four-element key vector, the decoder function, and every
//! numeric call site that routes through it.

use crate::hex::hex_to_bytes;
use crate::{Result, UnvmError};
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

lazy_static! {
    static ref POOL_RE: Regex =
        Regex::new(r#"["']([0-9a-fA-F]{200,})["']"#).expect("pool pattern");
    static ref KEYS_BRACED_RE: Regex = Regex::new(
        r"\{\s*(\d+)\s*[,;]\s*(\d+)\s*[,;]\s*(\d+)\s*[,;]\s*(\d+)"
    )
    .expect("braced keys pattern");
    static ref KEYS_BARE_RE: Regex =
        Regex::new(r"(\d+)\s*[,;]\s*(\d+)\s*[,;]\s*(\d+)\s*[,;]\s*(\d+)")
            .expect("bare keys pattern");
    static ref HEADER_RE: Regex =
        Regex::new(r"function\s+([A-Za-z0-9_]+)\s*\(\s*([A-Za-z0-9_]+)\s*\)")
            .expect("function header pattern");
    static ref FUNCTION_KW_RE: Regex =
        Regex::new(r"\bfunction\b").expect("function keyword pattern");
    static ref CALL_RE: Regex =
        Regex::new(r"([A-Za-z0-9_]+)\s*\(\s*(\d+)\s*\)").expect("call site pattern");
}

/// First quoted run of 200+ hex characters, decoded to bytes. Anything
/// shorter is assumed to be ordinary data, not the pool.
pub fn find_byte_pool(code: &str) -> Result<Vec<u8>> {
    let caps = POOL_RE.captures(code).ok_or(UnvmError::PoolNotFound)?;
    hex_to_bytes(&caps[1])
}

/// First brace-initialized list of four integers; falls back to the first
/// bare comma/semicolon-separated run of four when the braces were mangled
/// by earlier rewriting.
pub fn find_key_vector(code: &str) -> Result<[u32; 4]> {
    let caps = KEYS_BRACED_RE
        .captures(code)
        .or_else(|| KEYS_BARE_RE.captures(code))
        .ok_or(UnvmError::KeysNotFound)?;

    let mut keys = [0u32; 4];
    for (slot, group) in keys.iter_mut().zip(1usize..=4) {
        *slot = caps[group]
            .parse()
            .map_err(|_| UnvmError::KeysNotFound)?;
    }
    Ok(keys)
}

/// Structural decoder heuristic: a one-parameter function whose body starts
/// with a memo-table guard on that parameter (`if not cache[param]`). The
/// scan is bounded at the next `function` keyword, named or not, so a guard
/// past a nested function is never attributed to the outer one.
pub fn structural_candidate(code: &str) -> Option<String> {
    for caps in HEADER_RE.captures_iter(code) {
        let header = caps.get(0)?;
        let name = caps.get(1)?.as_str();
        let param = caps.get(2)?.as_str();

        let after = header.end();
        let body_end = FUNCTION_KW_RE
            .find(&code[after..])
            .map_or(code.len(), |m| after + m.start());
        let body = &code[after..body_end];

        let guard = Regex::new(&format!(
            r"if\s+not\s+[A-Za-z0-9_]+\s*\[\s*{}\s*\]",
            regex::escape(param)
        ))
        .ok()?;
        if guard.is_match(body) {
            return Some(name.to_string());
        }
    }

    None
}

/// How often each identifier is called with a single bare integer argument.
pub fn call_frequencies(code: &str) -> FxHashMap<String, usize> {
    let mut counts = FxHashMap::default();
    for caps in CALL_RE.captures_iter(code) {
        *counts.entry(caps[1].to_string()).or_insert(0) += 1;
    }
    counts
}

/// The structural candidate wins unless some other function is called with
/// integer arguments more than twice as often; ties between frequency
/// candidates break toward the lexicographically smallest name so the choice
/// is deterministic.
pub fn choose_decoder_name(
    structural: Option<&str>,
    counts: &FxHashMap<String, usize>,
    fallback: &str,
) -> String {
    let busiest = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, count)| (name.as_str(), *count));

    match (structural, busiest) {
        (Some(name), Some((busiest_name, busiest_count))) => {
            let own = counts.get(name).copied().unwrap_or(0);
            if busiest_name != name && busiest_count > own * 2 {
                busiest_name.to_string()
            } else {
                name.to_string()
            }
        }
        (Some(name), None) => name.to_string(),
        (None, Some((name, _))) => name.to_string(),
        (None, None) => fallback.to_string(),
    }
}

/// Distinct integer offsets passed to the decoder, in ascending order.
pub fn call_offsets(code: &str, decoder_name: &str) -> Vec<usize> {
    let mut offsets = BTreeSet::new();
    for caps in CALL_RE.captures_iter(code) {
        if &caps[1] == decoder_name {
            if let Ok(offset) = caps[2].parse::<usize>() {
                offsets.insert(offset);
            }
        }
    }
    offsets.into_iter().collect()
}
