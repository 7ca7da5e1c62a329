pub use anyhow;

use colored::Colorize;

pub type Res<T> = anyhow::Result<T>;

/// Clears the lowest set bit and returns its index.
pub fn pop_lsb64(x: &mut u64) -> u32 {
    let shift = x.trailing_zeros();
    *x &= *x - 1;
    shift
}

/// The number of distinct digits in the textual board and solution alphabet.
/// Color values are written as base-35 digits, `0`-`9` followed by `A`-`Y`.
pub const ALPHABET_SIZE: u8 = 35;

#[must_use]
pub fn digit_to_char(value: u8) -> char {
    debug_assert!(value < ALPHABET_SIZE);
    if value < 10 {
        (b'0' + value) as char
    } else {
        (b'A' + value - 10) as char
    }
}

pub fn char_to_digit(c: char) -> Res<u8> {
    match c {
        '0'..='9' => Ok(c as u8 - b'0'),
        'A'..='Y' => Ok(c as u8 - b'A' + 10),
        'a'..='y' => Ok(c as u8 - b'a' + 10),
        _ => Err(anyhow::anyhow!(
            "Invalid character {0}, expected a base-35 digit ('0'-'9' or 'A'-'Y')",
            c.to_string().red()
        )),
    }
}
