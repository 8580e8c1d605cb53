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
    binlog::{
        consts::{LoadDuplicateHandling, UnknownDuplicateHandling},
        BinlogStruct,
    },
    io::ReadMysqlExt,
    misc::{LimitRead, RawField, RawText},
};

/// Begin load query event.
///
/// Used for LOAD DATA INFILE statements as of MySQL 5.0.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct BeginLoadQueryEvent {
    pub file_id: u32,
    pub block_data: Vec<u8>,
}

impl BinlogStruct for BeginLoadQueryEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let file_id = input.read_u32::<LittleEndian>()?;

        let block_len = input.get_limit();
        let block_data = input.read_bytes(block_len)?;

        Ok(Self {
            file_id,
            block_data,
        })
    }
}

/// Execute load query event.
///
/// Used for LOAD DATA INFILE statements as of MySQL 5.0.
///
/// It similar to a query event but before executing the query it substitutes original filename
/// in LOAD DATA query with name of temporary file.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct ExecuteLoadQueryEvent {
    // post-header
    pub thread_id: u32,
    pub execution_time: u32,
    pub error_code: u16,
    /// File_id of a temporary file.
    pub file_id: u32,
    /// Pointer to the part of the query that should be substituted.
    pub start_pos: u32,
    /// Pointer to the end of this part of query
    pub end_pos: u32,
    /// How to handle duplicates.
    pub dup_handling: RawField<u8, UnknownDuplicateHandling, LoadDuplicateHandling>,

    // payload
    pub status_vars: Vec<u8>,
    pub schema: RawText,
    pub query: RawText,
}

impl ExecuteLoadQueryEvent {
    /// Length of the fixed part of this event.
    pub const POST_HEADER_LEN: usize = 4 + 4 + 1 + 2 + 2 + 4 + 4 + 4 + 1;
}

impl BinlogStruct for ExecuteLoadQueryEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let thread_id = input.read_u32::<LittleEndian>()?;
        let execution_time = input.read_u32::<LittleEndian>()?;
        let schema_len = input.read_u8()? as usize;
        let error_code = input.read_u16::<LittleEndian>()?;
        let status_vars_len = input.read_u16::<LittleEndian>()? as usize;
        let file_id = input.read_u32::<LittleEndian>()?;
        let start_pos = input.read_u32::<LittleEndian>()?;
        let end_pos = input.read_u32::<LittleEndian>()?;
        let dup_handling = input.read_u8()?;

        let status_vars = input.read_bytes(status_vars_len)?;
        let schema = input.read_bytes(schema_len)?;
        input.read_u8()?; // skip null

        let query_len = input.get_limit();
        let query = input.read_bytes(query_len)?;

        Ok(Self {
            thread_id,
            execution_time,
            error_code,
            file_id,
            start_pos,
            end_pos,
            dup_handling: RawField::new(dup_handling),
            status_vars,
            schema: RawText(schema),
            query: RawText(query),
        })
    }
}
