// Copyright (c) 2020 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Binlog-related structures and functions. This implementation assumes
//! binlog version >= 4 (MySql >= 5.0.0).
//!
//! A binlog is decoded by [`BinlogParser`] (or [`BinlogFile`] for a whole file) which keeps
//! the current format description event and the table map cache, so events must be fed in
//! the stream order.
//!
//! All structures of this module contains raw data that may not necessarily be valid.
//! Please consult the MySql documentation.

use std::io::{self, Read};

pub mod consts;
pub mod decimal;
pub mod error;
pub mod events;
pub mod header;
pub mod parser;
pub mod registry;
pub mod time;
pub mod value;

#[cfg(test)]
pub mod test_util;

pub use self::error::BinlogError;
pub use self::header::{BinlogEventHeader, BinlogFileHeader};
pub use self::parser::{BinlogFile, BinlogParser, Event, EventData, ParserOptions, SqlFilter};
pub use self::registry::{EventDecoder, EventRegistry};
pub use self::value::BinlogValue;

/// Binlog struct that has a fixed or self-delimited layout.
pub trait BinlogStruct {
    /// Will read this struct from the given stream.
    ///
    /// *   `data_len` is the length of the event body without the event header
    ///     and without the checksum trailer (it is kept for `FormatDescriptionEvent`),
    /// *   implementation must error with `UnexpectedEof` if `data_len` is less than minimum
    ///     length of this struct.
    fn read<T: Read>(data_len: usize, input: T) -> io::Result<Self>
    where
        Self: Sized;
}
