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
    misc::LimitRead,
};

/// Xid event.
///
/// Generated for a commit of a transaction that modifies one or more tables of an XA-capable
/// storage engine.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub struct XidEvent {
    pub xid: u64,
}

impl BinlogStruct for XidEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));
        let xid = input.read_u64::<LittleEndian>()?;
        Ok(Self { xid })
    }
}
