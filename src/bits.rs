//! Bit-field helpers for 16-bit LC-3 words.
//!
//! Every LC-3 instruction packs its operands into fixed ranges of one word.
//! These functions pull those ranges out and widen signed fields
//! to a full [`i16`].
//!
//! ```text
//! ADD R1, R0, #5
//! 0001 001 000 1 00101
//! ~~~~ ~~~ ~~~ ~ ~~~~~
//!   |   |   |  |   imm5   = bits(0, 5)
//!   |   |   |  mode       = bit(5)
//!   |   |   src_a         = bits(6, 3)
//!   |   dest              = bits(9, 3)
//!   opcode                = bits(12, 4)
//! ```

/// Extracts `len` bits of `word`, starting at bit `start` (0 = least significant).
///
/// # Example
/// ```
/// use lc3_sim::bits::bits;
///
/// assert_eq!(bits(0x1225, 9, 3), 0b001);
/// assert_eq!(bits(0x1225, 0, 5), 0b00101);
/// assert_eq!(bits(0x1225, 12, 4), 0b0001);
/// ```
pub const fn bits(word: u16, start: u32, len: u32) -> u16 {
    (word >> start) & mask(len)
}

/// Extracts the single bit of `word` at `index`.
pub const fn bit(word: u16, index: u32) -> bool {
    (word >> index) & 1 != 0
}

/// A mask covering the low `len` bits of a word.
pub const fn mask(len: u32) -> u16 {
    match len {
        16.. => u16::MAX,
        _    => (1 << len) - 1
    }
}

/// Sign-extends the low `len` bits of `field` to a full signed word.
///
/// The field must already be masked to `len` bits.
/// If the field's top bit is set, every bit above it is set to 1;
/// otherwise, the field is returned unchanged.
///
/// # Example
/// ```
/// use lc3_sim::bits::sign_extend;
///
/// assert_eq!(sign_extend(0b00101, 5), 5);
/// assert_eq!(sign_extend(0b11011, 5), -5);
/// assert_eq!(sign_extend(0x1FF, 9), -1);
/// assert_eq!(sign_extend(0x400, 11), -1024);
/// ```
pub const fn sign_extend(field: u16, len: u32) -> i16 {
    debug_assert!(0 < len && len <= 16);
    match bit(field, len - 1) {
        true  => (field | !mask(len)) as i16,
        false => field as i16,
    }
}

/// The high byte of a word.
pub const fn high_byte(word: u16) -> u8 {
    (word >> 8) as u8
}
/// The low byte of a word.
pub const fn low_byte(word: u16) -> u8 {
    word as u8
}
