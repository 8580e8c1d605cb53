// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use byteorder::ReadBytesExt;
use saturating::Saturating as S;
use serde::Serialize;

use std::io::{self, Read};

use crate::{
    binlog::BinlogStruct,
    io::ReadMysqlExt,
    misc::{LimitRead, RawText},
};

/// Query that caused the following `ROWS_EVENT`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct RowsQueryEvent {
    pub query: RawText,
}

impl BinlogStruct for RowsQueryEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        input.read_u8()?; // ignore length

        let query_len = input.get_limit();
        let query = input.read_bytes(query_len)?;

        Ok(Self {
            query: RawText(query),
        })
    }
}
