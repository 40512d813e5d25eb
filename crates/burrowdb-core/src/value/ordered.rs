//! Order-preserving byte forms: for each helper, lexicographic order of the
//! output matches numeric order of the input.

pub(crate) const fn ordered_i128_bytes(value: i128) -> [u8; 16] {
    let biased = value.cast_unsigned() ^ (1u128 << 127);
    biased.to_be_bytes()
}

pub(crate) const fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & 0x8000_0000_0000_0000 == 0 {
        bits ^ 0x8000_0000_0000_0000
    } else {
        !bits
    };

    ordered.to_be_bytes()
}

/// Escape `0x00` as `0x00 0xFF` and close with `0x00 0x00`, so a terminated
/// segment never prefixes a longer one.
pub(crate) fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[0, 0xFF]);
        } else {
            out.push(byte);
        }
    }

    out.extend_from_slice(&[0, 0]);
}
