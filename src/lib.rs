// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! This crate decodes MySql and MariaDB binary log files into a stream of typed events.
//!
//! ```no_run
//! use binlog_events::binlog::{BinlogFile, BinlogParser, EventData};
//!
//! # fn main() -> Result<(), binlog_events::binlog::BinlogError> {
//! for event in BinlogFile::open("mysql-bin.000001", 4, BinlogParser::default())? {
//!     if let EventData::RowsEvent(rows) = event?.data {
//!         println!("{} rows of table {}", rows.rows.len(), rows.table().table_name.get());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Decoding is sequential: [`binlog::BinlogParser`] keeps the current format description
//! event and the table map cache, so rows events can only be decoded after the table map
//! events they refer to.

#[macro_use]
pub mod bitflags_ext;

pub mod binlog;
pub mod io;
pub mod misc;
