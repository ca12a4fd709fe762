//! # lua-unvm
//!
//! Recovers readable Lua source from scripts protected by an XHider-style
//! string-hiding VM: folded constant arithmetic, decoder calls into a
//! hex-encoded byte pool, and minified keyword-fused text.
//!
//! ## Example
//!
//! ```rust
//! use lua_unvm::{Options, beautify};
//!
//! let pretty = beautify("localx=1", &Options::default());
//! assert!(pretty.contains("local x"));
//! ```

pub mod beautifier;
pub mod deobfuscate;
pub mod hex;
pub mod options;
pub mod shield;
pub mod span;
pub mod tokenizer;

pub use beautifier::beautify;
pub use deobfuscate::DeobfuscateContext;
pub use options::Options;
pub use shield::Shield;
pub use span::{Span, SpanKind};
pub use tokenizer::Tokenizer;

#[derive(Debug, thiserror::Error)]
pub enum UnvmError {
    #[error("byte pool not found: no quoted hex literal of 200+ characters")]
    PoolNotFound,

    #[error("key vector not found: no run of four integers")]
    KeysNotFound,

    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UnvmError>;

/// Runs the whole pipeline on one script: constant folding, pool/key/decoder
/// harvesting, call-site decoding and substitution, beautification, and
/// commenting out the now-inert decoder definition.
///
/// Fails only when the structural anchors (byte pool, key vector) are absent;
/// individual call sites that cannot be decoded are left untouched.
pub fn deobfuscate(code: &str, options: &Options) -> Result<String> {
    let folded = deobfuscate::constant_folding::fold_constants(code, options.max_fold_passes);

    let mut ctx = DeobfuscateContext::analyze(&folded, options)?;
    ctx.decode_call_sites(&folded);

    let reconstructed =
        deobfuscate::inline_strings::substitute_calls(&folded, &ctx.decoder_name, &ctx.decoded);
    let pretty = beautify(&reconstructed, options);

    Ok(deobfuscate::annotate::wrap_vm_block(
        &pretty,
        &ctx.decoder_name,
    ))
}
