// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::io;

/// Error returned while decoding a binlog stream.
#[derive(Debug, thiserror::Error)]
pub enum BinlogError {
    /// The stream does not start with `[ fe 'bin' ]`.
    #[error("not a binlog file: invalid magic {:02x?}", _0)]
    BadMagic([u8; 4]),
    /// Event header is shorter than 19 bytes or declares an invalid event size.
    #[error("malformed event header: {}", _0)]
    MalformedHeader(String),
    /// Format description event declares an event header length other than 19.
    #[error("unsupported event header length {}", _0)]
    UnsupportedHeaderLength(u8),
    /// Event body is shorter than its declared size or its fixed layout.
    #[error("truncated body of event type {event_type:#04x} ({len} bytes)")]
    TruncatedBody { event_type: u8, len: usize },
    /// A row image reads past the end of the rows event body.
    #[error("truncated row image of table {table_id}")]
    TruncatedRow { table_id: u64 },
    /// Rows event references a table id that has no preceding table map event.
    #[error("rows event references unknown table id {}", _0)]
    UnknownTable(u64),
    /// Rows event column count differs from the one of its table map event.
    #[error("column count mismatch for table {table_id}: table map has {expected}, rows event has {actual}")]
    ColumnCountMismatch {
        table_id: u64,
        expected: u64,
        actual: u64,
    },
    /// Row image contains a column type whose binary width is unknown.
    #[error("unsupported column type {:#04x}", _0)]
    UnsupportedColumnType(u8),
    /// Underlying byte source failed.
    #[error("io error: {}", _0)]
    Io(#[from] io::Error),
}

impl BinlogError {
    /// Returns `true` if this error is local to a single event body,
    /// i.e. the stream is still aligned on the next event.
    pub fn is_body_error(&self) -> bool {
        matches!(
            self,
            BinlogError::TruncatedBody { .. }
                | BinlogError::TruncatedRow { .. }
                | BinlogError::UnknownTable(_)
                | BinlogError::ColumnCountMismatch { .. }
                | BinlogError::UnsupportedColumnType(_)
        )
    }

    /// Converts an error of a fixed-layout decoder into a `BinlogError`.
    pub(crate) fn from_body_io(err: io::Error, event_type: u8, len: usize) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
                BinlogError::TruncatedBody { event_type, len }
            }
            _ => BinlogError::Io(err),
        }
    }
}
