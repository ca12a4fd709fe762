//! Comments out the now-inert decoder machinery with a labelled block
//! comment, keeping it readable for anyone auditing the output.

use regex::Regex;

/// Wraps the decoder function (its own body plus the trailing `end` of the
/// enclosing memo guard) in a long-bracket comment headed `DECODED VM`. If
/// the function cannot be located the text is returned unchanged.
pub fn wrap_vm_block(code: &str, decoder_name: &str) -> String {
    let Ok(re) = Regex::new(&format!(
        r"(?s)function\s+{}\s*\(.+?end\s*;?\s*end\s*;?",
        regex::escape(decoder_name)
    )) else {
        return code.to_string();
    };

    re.replace_all(code, |caps: &regex::Captures<'_>| {
        let inner = caps[0].trim();
        let (open, close) = bracket_delimiters(inner);
        format!("{open}\n{inner}\n{close}")
    })
    .into_owned()
}

/// Picks a long-bracket level that cannot collide with bracket sequences
/// inside the wrapped text. Level zero (`--[[`/`]]`) is the default; the
/// equals run grows until neither delimiter appears in the body.
fn bracket_delimiters(inner: &str) -> (String, String) {
    let mut eq = String::new();
    loop {
        let open_probe = format!("[{eq}[");
        let close_probe = format!("]{eq}]");
        if !inner.contains(&open_probe) && !inner.contains(&close_probe) {
            return (
                format!("--[{eq}[ DECODED VM"),
                format!("]{eq}]"),
            );
        }
        eq.push('=');
    }
}
