//! Natural ordering keys for contract numbers and item descriptions.
//!
//! Contract numbers and item descriptions mix text with counters
//! (`CTT-2`, `CTT-10`, `Item 3A`). Plain string ordering puts `CTT-10`
//! before `CTT-2`; [`natural_key`] converts the text into a string whose
//! lexicographic order matches what a person expects.
//!
//! # Rules
//!
//! - Leading and trailing whitespace is ignored; runs of inner whitespace
//!   collapse to one space.
//! - Letters compare case-insensitively.
//! - Every run of ASCII digits is zero-padded to [`DIGIT_WIDTH`] so numeric
//!   runs compare by value. Runs longer than that are kept as-is.

/// Width numeric runs are padded to.
pub const DIGIT_WIDTH: usize = 12;

/// Normalise text into a lexicographically-sortable key.
///
/// Input: `"CTT-2"`, `"CTT-10"`, `"Item 3a"`
/// Output: `"ctt-000000000002"`, `"ctt-000000000010"`, `"item 000000000003a"`
pub fn natural_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + DIGIT_WIDTH);
    let mut digits = String::new();
    let mut pending_space = false;

    for c in s.trim().chars() {
        if c.is_ascii_digit() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            digits.push(c);
            continue;
        }
        flush_digits(&mut out, &mut digits);
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(c.to_lowercase());
    }
    flush_digits(&mut out, &mut digits);
    out
}

fn flush_digits(out: &mut String, digits: &mut String) {
    if digits.is_empty() {
        return;
    }
    for _ in digits.len()..DIGIT_WIDTH {
        out.push('0');
    }
    out.push_str(digits);
    digits.clear();
}
