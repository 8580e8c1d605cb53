// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! MariaDB-specific events.

use byteorder::{LittleEndian, ReadBytesExt};
use saturating::Saturating as S;
use serde::Serialize;

use std::io::{self, Read};

use crate::{
    binlog::BinlogStruct,
    io::ReadMysqlExt,
    misc::{LimitRead, RawText},
};

/// Query that caused the following rows events (MariaDB).
///
/// Body is kept verbatim.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct AnnotateRowsEvent {
    pub query: RawText,
}

impl BinlogStruct for AnnotateRowsEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));
        let query = input.read_bytes(data_len)?;
        Ok(Self {
            query: RawText(query),
        })
    }
}

/// Binlog checkpoint event (MariaDB).
///
/// Body is kept verbatim.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct BinlogCheckpointEvent {
    pub data: Vec<u8>,
}

impl BinlogStruct for BinlogCheckpointEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));
        let data = input.read_bytes(data_len)?;
        Ok(Self { data })
    }
}

/// Global transaction identifier of the following event group (MariaDB).
///
/// Wire layout is `seq_no: 8, domain_id: 4, flags: 1` followed by an optional commit id
/// which isn't retained.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub struct MariadbGtidEvent {
    pub sequence_number: u64,
    pub domain_id: u32,
    /// Server id of the event header.
    pub server_id: u32,
    /// Zero if the body ends right after the domain id.
    pub flags: u8,
}

impl MariadbGtidEvent {
    /// Returns the textual `domain-server-sequence` form of this gtid.
    pub fn gtid_string(&self) -> String {
        format!(
            "{}-{}-{}",
            self.domain_id, self.server_id, self.sequence_number
        )
    }
}

impl BinlogStruct for MariadbGtidEvent {
    /// `server_id` is zero after this call and should be taken from the event header.
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let sequence_number = input.read_u64::<LittleEndian>()?;
        let domain_id = input.read_u32::<LittleEndian>()?;
        let flags = if input.get_limit() > 0 {
            input.read_u8()?
        } else {
            0
        };

        Ok(Self {
            sequence_number,
            domain_id,
            server_id: 0,
            flags,
        })
    }
}

/// A single entry of a MariaDB gtid list.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub struct MariadbGtid {
    pub domain_id: u32,
    pub server_id: u32,
    pub sequence_number: u64,
}

/// The last gtid of every replication domain at the start of a binlog (MariaDB).
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct MariadbGtidListEvent {
    /// High 4 bits of the count field.
    pub flags: u8,
    pub gtids: Vec<MariadbGtid>,
}

impl MariadbGtidListEvent {
    const COUNT_MASK: u32 = (1 << 28) - 1;
}

impl BinlogStruct for MariadbGtidListEvent {
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let raw_count = input.read_u32::<LittleEndian>()?;
        let count = (raw_count & Self::COUNT_MASK) as usize;

        // each entry takes 16 bytes, so `count` can't exceed the body
        if count > input.get_limit() / 16 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "gtid list is longer than the event",
            ));
        }

        let mut gtids = Vec::with_capacity(count);
        for _ in 0..count {
            let domain_id = input.read_u32::<LittleEndian>()?;
            let server_id = input.read_u32::<LittleEndian>()?;
            let sequence_number = input.read_u64::<LittleEndian>()?;
            gtids.push(MariadbGtid {
                domain_id,
                server_id,
                sequence_number,
            });
        }

        Ok(Self {
            flags: (raw_count >> 28) as u8,
            gtids,
        })
    }
}
