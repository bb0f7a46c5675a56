// pico-retro/src/core/cheat/decode.rs

//! Cheat code text formats.
//!
//! | format              | example       | system     |
//! |---------------------|---------------|------------|
//! | raw                 | `FF0123:0063` | Genesis    |
//! | raw                 | `C0F2:09`     | 8-bit      |
//! | Game Genie          | `SCRA-BJX0`   | Genesis    |
//! | Game Genie          | `3E1-23F-7A2` | 8-bit      |

use num_traits::Num;

use super::CheatError;

/// A decoded code: patch `value` at `address`, optionally only when the
/// current low byte equals `compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub address: u32,
    pub value: u16,
    pub compare: Option<u8>,
}

const GENIE_CHARS: &str = "AaBbCcDdEeFfGgHhJjKkLlMmNnPpRrSsTtVvWwXxYyZz0O1I2233445566778899";

pub fn decode(code: &str) -> Result<Decoded, CheatError> {
    let invalid = || CheatError::InvalidCode(code.to_string());
    if !code.is_ascii() {
        return Err(invalid());
    }
    let bytes = code.as_bytes();

    match (bytes.len(), bytes.get(3), bytes.get(4), bytes.get(6)) {
        (11, _, _, Some(b':')) => {
            let address = hex::<u32>(&code[..6]).ok_or_else(invalid)?;
            let value = hex::<u16>(&code[7..]).ok_or_else(invalid)?;
            Ok(Decoded { address, value, compare: None })
        }
        (7, _, Some(b':'), _) => {
            let address = hex::<u32>(&code[..4]).ok_or_else(invalid)?;
            let value = hex::<u16>(&code[5..]).ok_or_else(invalid)?;
            Ok(Decoded { address, value, compare: None })
        }
        (9, _, Some(b'-'), _) => {
            genie(&[&code[..4], &code[5..]].concat()).ok_or_else(invalid)
        }
        (8, _, _, _) => genie(code).ok_or_else(invalid),
        (7 | 11, Some(b'-'), _, _) => genie_8bit(code).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Hex field; rejects signs and anything else `from_str_radix` would accept.
fn hex<T: Num>(field: &str) -> Option<T> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    T::from_str_radix(field, 16).ok()
}

/// Genesis Game Genie, eight characters without the dash.
fn genie(code: &str) -> Option<Decoded> {
    let mut address = 0u32;
    let mut value = 0u16;

    for (i, c) in code.chars().enumerate() {
        let n = (GENIE_CHARS.find(c)? >> 1) as u32;
        match i {
            0 => value |= (n << 3) as u16,
            1 => {
                value |= (n >> 2) as u16;
                address |= (n & 3) << 14;
            }
            2 => address |= n << 9,
            3 => address |= (n & 0xF) << 20 | (n >> 4) << 8,
            4 => {
                value |= ((n & 1) << 12) as u16;
                address |= (n >> 1) << 16;
            }
            5 => value |= ((n & 1) << 15 | (n >> 1) << 8) as u16,
            6 => {
                value |= ((n >> 3) << 13) as u16;
                address |= (n & 7) << 5;
            }
            7 => address |= n,
            _ => return None,
        }
    }

    Some(Decoded { address, value, compare: None })
}

/// 8-bit Game Genie, `DDA-AAA` or `DDA-AAA-CCC`.
fn genie_8bit(code: &str) -> Option<Decoded> {
    let b = code.as_bytes();
    if code.len() == 11 && b[7] != b'-' {
        return None;
    }

    let digit = |i: usize| hex::<u32>(code.get(i..=i)?);

    let value = hex::<u16>(code.get(..2)?)?;
    let address = (digit(6)? ^ 0xF) << 12 | digit(2)? << 8 | digit(4)? << 4 | digit(5)?;

    // middle digit of the compare group is a checksum
    let compare = if code.len() == 11 {
        let packed = (digit(8)? << 4 | digit(10)?) as u8;
        Some(packed.rotate_right(2) ^ 0xBA)
    } else {
        None
    };

    Some(Decoded { address, value, compare })
}
