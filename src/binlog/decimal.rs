// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Binary representation of the `NEWDECIMAL` column.
//!
//! A decimal is stored as a sequence of big-endian base-1_000_000_000 words. Integer and
//! fractional parts are stored separately, each with a leading (integer part) or trailing
//! (fractional part) partial word for the digits that don't fill a whole word. The sign is
//! stored in the highest bit of the first byte (inverted), negative numbers are stored
//! bitwise inverted.

use std::{
    fmt::Write,
    io::{self, Read},
};

/// Number of decimal digits in a full word.
pub const DIG_PER_DEC: usize = 9;

/// Number of bytes required to store the given number of leftover digits.
pub const DIG_TO_BYTES: [usize; DIG_PER_DEC + 1] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];

/// Returns the binary size of a decimal of the given precision and scale.
pub fn decimal_bin_size(precision: usize, scale: usize) -> usize {
    let intg = precision.saturating_sub(scale);
    (intg / DIG_PER_DEC) * 4
        + DIG_TO_BYTES[intg % DIG_PER_DEC]
        + (scale / DIG_PER_DEC) * 4
        + DIG_TO_BYTES[scale % DIG_PER_DEC]
}

/// Reads a binary decimal and returns its textual representation.
pub fn read_decimal<T: Read>(precision: usize, scale: usize, mut input: T) -> io::Result<String> {
    let intg = precision.saturating_sub(scale);
    let intg0 = intg / DIG_PER_DEC;
    let intg0x = intg % DIG_PER_DEC;
    let frac0 = scale / DIG_PER_DEC;
    let frac0x = scale % DIG_PER_DEC;

    let mut bin = vec![0_u8; decimal_bin_size(precision, scale)];
    input.read_exact(&mut bin)?;

    if bin.is_empty() {
        return Ok(String::from("0"));
    }

    let negative = bin[0] & 0x80 == 0;
    bin[0] ^= 0x80;
    if negative {
        bin.iter_mut().for_each(|x| *x = !*x);
    }

    let mut chunks = Chunks(&bin[..]);
    let mut out = String::new();

    if negative {
        out.push('-');
    }

    let mut int_part = String::new();
    if intg0x > 0 {
        let x = chunks.next_word(DIG_TO_BYTES[intg0x]);
        if x > 0 {
            let _ = write!(int_part, "{}", x);
        }
    }
    for _ in 0..intg0 {
        let x = chunks.next_word(4);
        if int_part.is_empty() {
            if x > 0 {
                let _ = write!(int_part, "{}", x);
            }
        } else {
            let _ = write!(int_part, "{:09}", x);
        }
    }
    if int_part.is_empty() {
        int_part.push('0');
    }
    out.push_str(&int_part);

    if scale > 0 {
        out.push('.');
        for _ in 0..frac0 {
            let x = chunks.next_word(4);
            let _ = write!(out, "{:09}", x);
        }
        if frac0x > 0 {
            let x = chunks.next_word(DIG_TO_BYTES[frac0x]);
            let _ = write!(out, "{:0width$}", x, width = frac0x);
        }
    }

    Ok(out)
}

/// Big-endian reader over an in-memory decimal.
struct Chunks<'a>(&'a [u8]);

impl Chunks<'_> {
    fn next_word(&mut self, len: usize) -> u32 {
        let (word, rest) = self.0.split_at(len);
        self.0 = rest;
        word.iter().fold(0, |acc, x| (acc << 8) | u32::from(*x))
    }
}
