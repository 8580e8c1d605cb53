// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use byteorder::{LittleEndian, ReadBytesExt};
use saturating::Saturating as S;
use serde::Serialize;

use std::io::{self, Read};

use crate::{
    binlog::BinlogStruct,
    io::ReadMysqlExt,
    misc::{LimitRead, RawText},
};

/// A query event is created for each query that modifies the database, unless the query
/// is logged row-based.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct QueryEvent {
    // post-header fields
    /// The ID of the thread that issued this statement. It is needed for temporary tables.
    pub thread_id: u32,
    /// The time from when the query started to when it was logged in the binlog, in seconds.
    pub execution_time: u32,
    /// Error code generated by the master. If the master fails, the slave will fail with
    /// the same error code.
    pub error_code: u16,

    // payload
    /// Zero or more raw status variables (`status_vars_length` bytes).
    pub status_vars: Vec<u8>,
    /// The currently selected database name (`schema-length` bytes).
    pub schema: RawText,
    /// The SQL query.
    pub query: RawText,
}

impl BinlogStruct for QueryEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let thread_id = input.read_u32::<LittleEndian>()?;
        let execution_time = input.read_u32::<LittleEndian>()?;
        let schema_len = input.read_u8()? as usize;
        let error_code = input.read_u16::<LittleEndian>()?;
        let status_vars_len = input.read_u16::<LittleEndian>()? as usize;

        let status_vars = input.read_bytes(status_vars_len)?;
        let schema = input.read_bytes(schema_len)?;

        input.read_u8()?; // skip null

        let query_len = input.get_limit();
        let query = input.read_bytes(query_len)?;

        Ok(Self {
            thread_id,
            execution_time,
            error_code,
            status_vars,
            schema: RawText(schema),
            query: RawText(query),
        })
    }
}
