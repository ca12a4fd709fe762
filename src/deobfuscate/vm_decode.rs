//! Pure simulation of the hidden VM's string-unhiding routine.

/// One byte/key combination, as the VM computes it: 8 rounds of halving with
/// a parity check, accumulating `2^round` whenever the low bits differ. For
/// values in 0-255 this is exactly a bitwise XOR, but the VM never uses
/// bitwise operators, only division.
pub fn combine(mut byte: u32, mut key: u32) -> u32 {
    let mut value = 0;

    for round in 0..8 {
        if byte % 2 != key % 2 {
            value += 1 << round;
        }
        byte /= 2;
        key /= 2;
    }

    value
}

fn pool_byte(pool: &[u8], one_based: usize) -> Option<u32> {
    pool.get(one_based.checked_sub(1)?).map(|&b| u32::from(b))
}

/// Recovers one hidden string from the byte pool.
///
/// Reads four key-combined length bytes (little-endian) at `offset + 1`
/// (1-indexed), then that many payload bytes, each combined with the
/// rotating 4-key pad. Any out-of-range pool access yields `None`; callers
/// must leave the corresponding call site unmodified.
pub fn decode(pool: &[u8], keys: [u32; 4], offset: usize) -> Option<String> {
    let idx = offset.checked_add(1)?;

    let b0 = pool_byte(pool, idx)?;
    let b1 = pool_byte(pool, idx.checked_add(1)?)?;
    let b2 = pool_byte(pool, idx.checked_add(2)?)?;
    let b3 = pool_byte(pool, idx.checked_add(3)?)?;

    let length = u64::from(combine(b0, keys[0]))
        + u64::from(combine(b1, keys[1])) * 256
        + u64::from(combine(b2, keys[2])) * 65_536
        + u64::from(combine(b3, keys[3])) * 16_777_216;

    let mut out = String::new();
    for i in 0..length {
        let position = idx.checked_add(4)?.checked_add(usize::try_from(i).ok()?)?;
        let byte = pool_byte(pool, position)?;
        let code = combine(byte, keys[(i % 4) as usize]);
        out.push(char::from(code as u8));
    }

    Some(out)
}
