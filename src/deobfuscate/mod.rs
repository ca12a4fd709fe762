//! VM recovery: harvesting the pool/keys/decoder, simulating the decode
//! routine, inlining the recovered strings, and annotating the leftovers.

pub mod annotate;
pub mod constant_folding;
pub mod harvest;
pub mod inline_strings;
pub mod vm_decode;

use crate::options::Options;
use crate::Result;
use rustc_hash::FxHashMap;

/// Everything harvested from one obfuscated script, plus the strings
/// recovered so far. Built in two phases: `analyze` locates the VM's
/// artifacts, `decode_call_sites` fills the offset-to-string table.
pub struct DeobfuscateContext {
    pub pool: Vec<u8>,
    pub keys: [u32; 4],
    pub decoder_name: String,
    pub decoded: FxHashMap<usize, String>,
}

impl DeobfuscateContext {
    /// Locates the byte pool, key vector, and decoder name. The pool and
    /// keys are hard requirements; the decoder name falls back to
    /// `options.decoder_fallback` when neither heuristic finds one.
    pub fn analyze(code: &str, options: &Options) -> Result<Self> {
        let pool = harvest::find_byte_pool(code)?;
        let keys = harvest::find_key_vector(code)?;

        let structural = harvest::structural_candidate(code);
        let counts = harvest::call_frequencies(code);
        let decoder_name = harvest::choose_decoder_name(
            structural.as_deref(),
            &counts,
            &options.decoder_fallback,
        );

        Ok(Self {
            pool,
            keys,
            decoder_name,
            decoded: FxHashMap::default(),
        })
    }

    /// Runs the decoder simulation for every distinct call-site offset.
    /// Offsets that fail to decode are simply absent from the table, which
    /// leaves their call sites untouched during substitution.
    pub fn decode_call_sites(&mut self, code: &str) {
        for offset in harvest::call_offsets(code, &self.decoder_name) {
            if let Some(text) = vm_decode::decode(&self.pool, self.keys, offset) {
                self.decoded.insert(offset, text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_source() -> String {
        // Pool with one entry at offset 0 ("ok"), keys {1,2,3,4}, memoized
        // decoder m, two call sites (one valid, one out of range).
        let keys = [1u32, 2, 3, 4];
        let mut pool = vec![0u8; 110];
        let text = b"ok";
        let length = (text.len() as u32).to_le_bytes();
        for (i, b) in length.iter().enumerate() {
            pool[i] = b ^ (keys[i] as u8);
        }
        for (i, &b) in text.iter().enumerate() {
            pool[4 + i] = b ^ (keys[i % 4] as u8);
        }

        let hex: String = pool.iter().map(|b| format!("{b:02x}")).collect();
        format!(
            "local q = {{1,2,3,4}} local h = \"{hex}\" local c = {{}} \
             function m(p) if not c[p] then c[p] = 1 return c[p] end end \
             print(m(0)) print(m(400))"
        )
    }

    #[test]
    fn test_analyze_finds_all_artifacts() {
        let source = vm_source();
        let ctx = DeobfuscateContext::analyze(&source, &Options::default())
            .expect("artifacts should be found");

        assert_eq!(ctx.pool.len(), 110);
        assert_eq!(ctx.keys, [1, 2, 3, 4]);
        assert_eq!(ctx.decoder_name, "m");
        assert!(ctx.decoded.is_empty(), "Nothing decoded before phase two");
    }

    #[test]
    fn test_decode_call_sites_skips_failures() {
        let source = vm_source();
        let mut ctx = DeobfuscateContext::analyze(&source, &Options::default())
            .expect("artifacts should be found");
        ctx.decode_call_sites(&source);

        assert_eq!(ctx.decoded.get(&0).map(String::as_str), Some("ok"));
        assert!(
            !ctx.decoded.contains_key(&400),
            "Out-of-range offset must not decode"
        );
    }
}
