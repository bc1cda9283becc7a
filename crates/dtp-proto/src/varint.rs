//! Decoding of base-128 varints: little-endian 7-bit groups, high bit set on
//! every byte except the last.
//!
//! Encoding goes through `prost::encoding`; decoding works on a partially
//! filled scratch buffer, so it reports an incomplete varint as `None`.

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN64: usize = 10;

/// Longest encoding of a `u32`; the size of the length-prefix scratch buffer.
pub const MAX_VARINT_LEN32: usize = 5;

/// Decode a varint from the front of `buf`. Returns `(value, bytes_consumed)`.
///
/// `None` if `buf` ends inside the varint or the encoding runs past ten bytes.
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN64 {
            return None;
        }
        let group = (byte & 0x7F) as u64;
        if i == MAX_VARINT_LEN64 - 1 && group > 1 {
            return None; // overflow
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }

    None
}
