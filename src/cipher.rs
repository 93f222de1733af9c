//! Positional character shift applied to passwords in the account files.
//!
//! This is a storage format, not protection: anyone with the files can undo
//! it. Each char code moves by `position + SHIFT` modulo 255.

const SHIFT: u32 = 11;
const MODULUS: u32 = 255;

/// Largest char code that survives `reveal(obscure(p))`.
pub const MAX_CODE: u32 = MODULUS - 1;

pub fn obscure(password: &str) -> String {
    password
        .chars()
        .enumerate()
        .map(|(i, c)| shift(c as u32 + offset(i)))
        .collect()
}

pub fn reveal(stored: &str) -> String {
    stored
        .chars()
        .enumerate()
        .map(|(i, c)| shift(c as u32 + MODULUS - offset(i)))
        .collect()
}

/// True when `password` round-trips and its stored form fits on one line.
pub fn is_storable(password: &str) -> bool {
    password.chars().all(|c| (c as u32) <= MAX_CODE)
        && !obscure(password).contains(['\n', '\r'])
}

fn offset(position: usize) -> u32 {
    ((position as u32) + SHIFT) % MODULUS
}

fn shift(code: u32) -> char {
    // Results are below 255, always a valid scalar value.
    char::from_u32(code % MODULUS).unwrap_or('\0')
}
