// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use bitvec::{order::BitOrder, vec::BitVec};
use saturating::Saturating as S;
use serde::{Serialize, Serializer};

use std::{
    borrow::Cow,
    cmp::min,
    convert::TryFrom,
    fmt,
    io::{self, Read},
    marker::PhantomData,
};

use crate::bitflags_ext::Bitflags;

/// Splits server 'version' string into three numeric pieces.
///
/// The string is cut at the first `\0`. Major and minor must be dot-separated numbers,
/// the patch number is parsed up to the first non-digit character. It'll return `(0, 0, 0)`
/// if there are less than three pieces; a piece that fails to parse is `0`.
pub fn split_version<T: AsRef<[u8]>>(version_str: T) -> (u32, u32, u32) {
    let bytes = version_str.as_ref();
    let bytes = match bytes.iter().position(|c| *c == 0) {
        Some(position) => &bytes[..position],
        None => bytes,
    };

    let mut pieces = bytes.splitn(3, |c| *c == b'.');
    let (major, minor, patch) = match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(major), Some(minor), Some(patch)) => (major, minor, patch),
        _ => return (0, 0, 0),
    };

    let digits = patch.iter().take_while(|c| c.is_ascii_digit()).count();

    (
        parse_decimal(major),
        parse_decimal(minor),
        parse_decimal(&patch[..digits]),
    )
}

/// Computes `(major * 256 + minor) * 256 + patch` for the given server version string.
pub fn version_product<T: AsRef<[u8]>>(version_str: T) -> u64 {
    let (major, minor, patch) = split_version(version_str);
    (u64::from(major) * 256 + u64::from(minor)) * 256 + u64::from(patch)
}

fn parse_decimal(bytes: &[u8]) -> u32 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

pub(crate) struct LimitedRead<T> {
    limit: S<usize>,
    read: T,
}

impl<T> LimitedRead<T> {
    pub fn new(read: T, limit: S<usize>) -> Self {
        Self { read, limit }
    }

    pub fn get_limit(&self) -> usize {
        self.limit.0
    }
}

impl<T: Read> Read for LimitedRead<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = min(buf.len(), self.limit.0);
        let count = self.read.read(&mut buf[..limit])?;
        self.limit -= S(count);
        Ok(count)
    }
}

pub(crate) trait LimitRead: Read + Sized {
    fn limit(&mut self, limit: S<usize>) -> LimitedRead<&mut Self> {
        LimitedRead::new(self, limit)
    }
}

impl<T: Read> LimitRead for T {}

/// Wrapper for a raw value of a particular type.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct RawField<T, E, V>(pub T, PhantomData<(E, V)>);

impl<T: Copy, U: Into<T>, V: TryFrom<T, Error = U>> RawField<T, U, V> {
    /// Creates a new wrapper.
    pub fn new(t: T) -> Self {
        Self(t, PhantomData)
    }

    /// Returns either parsed value of this field, or raw value in case of an error.
    pub fn get(&self) -> Result<V, U> {
        V::try_from(self.0)
    }
}

impl<T: fmt::Debug, U: fmt::Debug, V: fmt::Debug> fmt::Debug for RawField<T, U, V>
where
    T: Copy,
    U: Into<T>,
    V: TryFrom<T, Error = U>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match V::try_from(self.0) {
            Ok(u) => u.fmt(f),
            Err(t) => write!(
                f,
                "Unknown value for type {}: {:?}",
                std::any::type_name::<U>(),
                t
            ),
        }
    }
}

impl<T: Serialize, U, V> Serialize for RawField<T, U, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Wrapper for a sequence of values of a particular type.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct RawSeq<T, U, V>(pub Vec<T>, PhantomData<(U, V)>);

impl<T: Copy, U: Into<T>, V: TryFrom<T, Error = U>> RawSeq<T, U, V> {
    /// Creates a new wrapper.
    pub fn new(t: Vec<T>) -> Self {
        Self(t, PhantomData)
    }

    /// Returns either parsed value at the given index, or raw value in case of an error.
    pub fn get(&self, index: usize) -> Option<Result<V, U>> {
        self.0.get(index).copied().map(V::try_from)
    }

    /// Returns a length of this sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if this sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: fmt::Debug, U: fmt::Debug, V: fmt::Debug> fmt::Debug for RawSeq<T, U, V>
where
    T: Copy,
    U: Into<T>,
    V: TryFrom<T, Error = U>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0
            .iter()
            .copied()
            .map(RawField::<T, U, V>::new)
            .collect::<Vec<_>>()
            .fmt(f)
    }
}

impl<T: Serialize, U, V> Serialize for RawSeq<T, U, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Wrapper for raw flags value.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct RawFlags<T: Bitflags>(pub T::Repr);

impl<T: Bitflags> RawFlags<T> {
    /// Returns parsed flags. Unknown bits will be truncated.
    pub fn get(&self) -> T {
        T::from_bits_truncate(self.0)
    }
}

impl<T: fmt::Debug> fmt::Debug for RawFlags<T>
where
    T: Bitflags,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.get())?;
        let unknown_bits = self.0 & !T::all().bits();
        if unknown_bits != T::Repr::default() {
            write!(
                f,
                " (Unknown bits: {:0width$b})",
                unknown_bits,
                width = T::REPR_BITS,
            )?
        }
        Ok(())
    }
}

impl<T: Bitflags> Serialize for RawFlags<T>
where
    T::Repr: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Wrapper for raw text value.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RawText<T = Vec<u8>>(pub T);

impl<T: AsRef<[u8]>> RawText<T> {
    /// Returns the text up to the first `\0` (lossy converted).
    pub fn get(&self) -> Cow<'_, str> {
        let slice = self.0.as_ref();
        match slice.iter().position(|c| *c == 0) {
            Some(position) => String::from_utf8_lossy(&slice[..position]),
            None => String::from_utf8_lossy(slice),
        }
    }

    /// Returns raw bytes of this text.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>> fmt::Debug for RawText<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt(f)
    }
}

impl<T: AsRef<[u8]>> Serialize for RawText<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.get())
    }
}

/// Serializes a bitmap as a sequence of booleans.
pub(crate) fn serialize_bits<O, S>(bits: &BitVec<u8, O>, serializer: S) -> Result<S::Ok, S::Error>
where
    O: BitOrder,
    S: Serializer,
{
    serializer.collect_seq(bits.iter().by_vals())
}

/// Serializes an optional bitmap as a sequence of booleans or `None`.
pub(crate) fn serialize_opt_bits<O, S>(
    bits: &Option<BitVec<u8, O>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    O: BitOrder,
    S: Serializer,
{
    match bits {
        Some(bits) => serialize_bits(bits, serializer),
        None => serializer.serialize_none(),
    }
}
