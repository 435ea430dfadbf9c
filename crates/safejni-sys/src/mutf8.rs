//! Java's modified UTF-8.
//!
//! JNI string and name entries use a variant of UTF-8 that encodes NUL as
//! the two bytes `C0 80` and characters outside the Basic Multilingual Plane
//! as a pair of three-byte surrogates. Everything else matches UTF-8.

/// Encode `text` as NUL-terminated modified UTF-8.
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 1);
    for ch in text.chars() {
        match ch {
            '\0' => out.extend_from_slice(&[0xC0, 0x80]),
            ch if (ch as u32) < 0x1_0000 => {
                let mut buf = [0; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            ch => {
                let mut units = [0; 2];
                for unit in ch.encode_utf16(&mut units) {
                    push_three_byte(&mut out, *unit);
                }
            }
        }
    }
    out.push(0);
    out
}

fn push_three_byte(out: &mut Vec<u8>, unit: u16) {
    out.push(0xE0 | (unit >> 12) as u8);
    out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
    out.push(0x80 | (unit & 0x3F) as u8);
}

/// Decode modified UTF-8 (without the terminator).
///
/// Malformed input, including unpaired surrogates, decodes to U+FFFD in place
/// of the offending sequence.
pub fn decode(bytes: &[u8]) -> String {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        let (unit, width) = match b0 {
            0x00..=0x7F => (u16::from(b0), 1),
            0xC0..=0xDF if continuation(bytes, i + 1) => {
                (u16::from(b0 & 0x1F) << 6 | u16::from(bytes[i + 1] & 0x3F), 2)
            }
            0xE0..=0xEF if continuation(bytes, i + 1) && continuation(bytes, i + 2) => (
                u16::from(b0 & 0x0F) << 12 | u16::from(bytes[i + 1] & 0x3F) << 6 | u16::from(bytes[i + 2] & 0x3F),
                3,
            ),
            _ => (0xFFFD, 1),
        };
        units.push(unit);
        i += width;
    }
    char::decode_utf16(units)
        .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn continuation(bytes: &[u8], index: usize) -> bool {
    bytes.get(index).is_some_and(|b| b & 0xC0 == 0x80)
}
