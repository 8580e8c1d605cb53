// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::{
    fmt,
    ops::{BitAnd, Not},
};

/// Trait for types generated using `bitflags::bitflags!` macro.
pub trait Bitflags: Copy {
    type Repr: Copy
        + Default
        + Eq
        + std::hash::Hash
        + fmt::Binary
        + BitAnd<Output = Self::Repr>
        + Not<Output = Self::Repr>;

    /// Bit width of the underlying representation.
    const REPR_BITS: usize;

    fn empty() -> Self;
    fn all() -> Self;
    fn bits(&self) -> Self::Repr;
    fn from_bits(bits: Self::Repr) -> Option<Self>;
    fn from_bits_truncate(bits: Self::Repr) -> Self;
    fn contains(&self, other: Self) -> bool;
}

/// It's a wrapper for `bitflags::bitflags!` macro that also implements the `Bitflags` trait.
macro_rules! my_bitflags {
    ($name:ident, $ty:ty, $($def:tt)*) => {
        impl $crate::bitflags_ext::Bitflags for $name {
            type Repr = $ty;

            const REPR_BITS: usize = std::mem::size_of::<$ty>() * 8;

            #[inline]
            fn empty() -> Self {
                $name::empty()
            }

            #[inline]
            fn all() -> Self {
                $name::all()
            }

            #[inline]
            fn bits(&self) -> Self::Repr {
                $name::bits(self)
            }

            #[inline]
            fn from_bits(bits: Self::Repr) -> Option<Self> {
                $name::from_bits(bits)
            }

            #[inline]
            fn from_bits_truncate(bits: Self::Repr) -> Self {
                $name::from_bits_truncate(bits)
            }

            #[inline]
            fn contains(&self, other: Self) -> bool {
                $name::contains(self, other)
            }
        }

        impl Default for $name {
            fn default() -> $name {
                $name::empty()
            }
        }

        bitflags::bitflags! { $($def)* }
    };
}
