//! Mu-law (G.711 u-law) decoding
//!
//! Converts 8-bit logarithmic mu-law codes to 16-bit linear PCM.
//! Mu-law is the telephony companding format most voice transports
//! deliver; decoding is a fixed table lookup plus bit-field extraction.

/// Linear offset per exponent segment (standard G.711 decode table)
const DECODE_TABLE: [i16; 8] = [0, 132, 396, 924, 1980, 4092, 8316, 16764];

/// Decode a single mu-law byte to a 16-bit linear sample.
///
/// Every byte value is a valid mu-law code; there is no error path.
/// Pure function with no state, safe to call from the audio callback.
///
/// The encoding stores the code inverted: sign in bit 7, a 3-bit
/// exponent in bits 6-4, and a 4-bit mantissa in bits 3-0.
pub fn decode(byte: u8) -> i16 {
    let code = !byte;
    let sign = code & 0x80;
    let exponent = ((code >> 4) & 0x07) as usize;
    let mantissa = (code & 0x0F) as i16;

    let sample = DECODE_TABLE[exponent] + (mantissa << (exponent + 3));

    if sign != 0 {
        -sample
    } else {
        sample
    }
}
