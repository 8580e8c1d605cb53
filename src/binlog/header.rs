// Copyright (c) 2020 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use std::io::Read;

use super::{
    consts::{EventFlags, EventType, UnknownEventType, BINLOG_MAGIC, EVENT_HEADER_LEN},
    error::BinlogError,
};
use crate::{
    io::read_full,
    misc::{RawField, RawFlags},
};

/// A binlog file starts with a Binlog File Header `[ fe 'bin' ]`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct BinlogFileHeader;

impl BinlogFileHeader {
    /// Length of a binlog file header.
    pub const LEN: usize = 4;
    /// Value of a binlog file header.
    pub const VALUE: [u8; Self::LEN] = BINLOG_MAGIC;

    /// Reads and checks the binlog file header.
    ///
    /// It'll return `BadMagic` if the stream is shorter than the header or header != `Self::VALUE`.
    pub fn read<T: Read>(input: T) -> Result<Self, BinlogError> {
        let mut buf = [0_u8; Self::LEN];
        read_full(input, &mut buf)?;

        if buf != Self::VALUE {
            return Err(BinlogError::BadMagic(buf));
        }

        Ok(Self)
    }
}

/// The binlog event header starts each event and is 19 bytes long assuming binlog version >= 4.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct BinlogEventHeader {
    /// Seconds since unix epoch.
    pub timestamp: u32,
    /// Raw event Type.
    pub event_type: RawField<u8, UnknownEventType, EventType>,
    /// Server-id of the originating mysql-server.
    ///
    /// Used to filter out events in circular replication.
    pub server_id: u32,
    /// Size of the event (header, post-header, body, checksum).
    pub event_size: u32,
    /// Position of the next event.
    pub log_pos: u32,
    /// Binlog Event Flag.
    pub flags: RawFlags<EventFlags>,
}

impl BinlogEventHeader {
    /// Binlog event header length for version >= 4.
    pub const LEN: usize = EVENT_HEADER_LEN;

    /// Decodes a header from exactly `Self::LEN` bytes.
    pub fn parse(buf: &[u8; Self::LEN]) -> Result<Self, BinlogError> {
        let mut input = &buf[..];

        let timestamp = input.read_u32::<LittleEndian>()?;
        let event_type = input.read_u8()?;
        let server_id = input.read_u32::<LittleEndian>()?;
        let event_size = input.read_u32::<LittleEndian>()?;
        let log_pos = input.read_u32::<LittleEndian>()?;
        let flags = input.read_u16::<LittleEndian>()?;

        if (event_size as usize) < Self::LEN {
            return Err(BinlogError::MalformedHeader(format!(
                "event size {} is less than header length {}",
                event_size,
                Self::LEN
            )));
        }

        Ok(Self {
            timestamp,
            event_type: RawField::new(event_type),
            server_id,
            event_size,
            log_pos,
            flags: RawFlags(flags),
        })
    }

    /// Reads next header from the given stream.
    ///
    /// Returns `None` at a clean end of the stream (no bytes left),
    /// `MalformedHeader` if the stream ends in the middle of a header.
    pub fn read<T: Read>(input: T) -> Result<Option<Self>, BinlogError> {
        let mut buf = [0_u8; Self::LEN];
        match read_full(input, &mut buf)? {
            0 => Ok(None),
            n if n < Self::LEN => Err(BinlogError::MalformedHeader(format!(
                "short read: {} of {} header bytes",
                n,
                Self::LEN
            ))),
            _ => Self::parse(&buf).map(Some),
        }
    }

    /// Returns the length of the event data (post-header, body and checksum, if any).
    pub fn data_len(&self) -> usize {
        (self.event_size as usize).saturating_sub(Self::LEN)
    }
}
