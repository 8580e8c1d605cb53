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
    misc::{LimitRead, RawText},
};

/// The rotate event is added to the binlog as last event
/// to tell the reader what binlog to request next.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct RotateEvent {
    // post-header
    /// Position of the first event in the next binlog.
    pub position: u64,

    // payload
    /// Name of the next binlog (not terminated).
    pub name: RawText,
}

impl BinlogStruct for RotateEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let position = input.read_u64::<LittleEndian>()?;

        let mut name = vec![0_u8; input.get_limit()];
        input.read_exact(&mut name)?;

        Ok(Self {
            position,
            name: RawText(name),
        })
    }
}
