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

use std::{
    convert::TryFrom,
    fmt,
    io::{self, Read},
};

use crate::{
    binlog::{
        consts::{
            BinlogChecksumAlg, BinlogVersion, UnknownBinlogVersion, UnknownChecksumAlg,
            BINLOG_CHECKSUM_ALG_DESC_LEN, BINLOG_CHECKSUM_LEN, CHECKSUM_VERSION_PRODUCT_MARIADB,
            EVENT_HEADER_LEN,
        },
        error::BinlogError,
        BinlogStruct,
    },
    misc::{LimitRead, RawField, RawText},
};

/// A wrapper for 50-bytes array.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct RawServerVersion(pub [u8; FormatDescriptionEvent::SERVER_VER_LEN]);

impl fmt::Debug for RawServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0[..], f)
    }
}

impl AsRef<[u8]> for RawServerVersion {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

/// A format description event is the first event of a binlog for binlog-version 4.
///
/// It describes how the other events are layed out.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct FormatDescriptionEvent {
    /// Version of this binlog format.
    pub binlog_version: RawField<u16, UnknownBinlogVersion, BinlogVersion>,

    /// Version of the server that created the binlog (len=50).
    pub server_version: RawText<RawServerVersion>,

    /// Seconds since Unix epoch when the binlog was created.
    pub create_timestamp: u32,

    /// Declared length of the common event header. Only `19` is supported.
    pub event_header_length: u8,

    /// An array indexed by Binlog Event Type - 1 to extract the length of the event specific
    /// header.
    ///
    /// Use [`Self::get_event_type_header_length`] to get header length for particular event type.
    pub event_type_header_lengths: Vec<u8>,

    /// Checksum algorithm of the following events.
    ///
    /// It's `BINLOG_CHECKSUM_ALG_UNDEF` if the server predates checksums.
    pub checksum_alg: RawField<u8, UnknownChecksumAlg, BinlogChecksumAlg>,
}

impl FormatDescriptionEvent {
    /// Length of a server version string.
    pub const SERVER_VER_LEN: usize = 50;
    /// Offset of a server version string.
    pub const SERVER_VER_OFFSET: usize = 2;
    /// Offset of the event type header lengths table.
    pub const HEADER_LENGTHS_OFFSET: usize = Self::SERVER_VER_OFFSET + Self::SERVER_VER_LEN + 4 + 1;

    /// Length of a rows event post-header that carries a 4-byte table id.
    pub const SHORT_TABLE_ID_POST_HEADER_LEN: u8 = 6;

    /// Creates a format description event that is used before the stream's own one is seen.
    ///
    /// It has an empty header lengths table (so 6-byte table ids) and no checksum.
    pub fn new(binlog_version: BinlogVersion) -> Self {
        Self {
            binlog_version: RawField::new(binlog_version as u16),
            server_version: RawText(RawServerVersion([0_u8; Self::SERVER_VER_LEN])),
            create_timestamp: 0,
            event_header_length: EVENT_HEADER_LEN as u8,
            event_type_header_lengths: Vec::new(),
            checksum_alg: RawField::new(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_OFF as u8),
        }
    }

    /// Returns a parsed server version.
    pub fn split_version(&self) -> (u32, u32, u32) {
        crate::misc::split_version(&self.server_version.0)
    }

    /// Returns `(major * 256 + minor) * 256 + patch` for the server version.
    pub fn version_product(&self) -> u64 {
        crate::misc::version_product(&self.server_version.0)
    }

    /// Returns parsed checksum algorithm, or raw value if algorithm is unknown.
    pub fn get_checksum_alg(&self) -> Result<BinlogChecksumAlg, UnknownChecksumAlg> {
        self.checksum_alg.get()
    }

    /// Returns `true` if every non-fde event carries a CRC32 checksum trailer.
    pub fn has_checksum(&self) -> bool {
        self.get_checksum_alg() == Ok(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_CRC32)
    }

    /// Returns post-header length for the given raw event type, if defined.
    pub fn get_event_type_header_length(&self, event_type: u8) -> Option<u8> {
        if event_type == 0 {
            return None;
        }

        self.event_type_header_lengths
            .get(usize::from(event_type) - 1)
            .copied()
    }

    /// Returns the length of a table id on the wire for events of the given type.
    ///
    /// Post-header length `6` means 4-byte table ids, anything else (including
    /// a missing table entry) means 6-byte table ids.
    pub fn table_id_len(&self, event_type: u8) -> usize {
        match self.get_event_type_header_length(event_type) {
            Some(Self::SHORT_TABLE_ID_POST_HEADER_LEN) => 4,
            _ => 6,
        }
    }

    /// Fails with `UnsupportedHeaderLength` if declared header length isn't `19`.
    pub fn check_header_length(&self) -> Result<(), BinlogError> {
        if usize::from(self.event_header_length) != EVENT_HEADER_LEN {
            return Err(BinlogError::UnsupportedHeaderLength(
                self.event_header_length,
            ));
        }
        Ok(())
    }
}

impl BinlogStruct for FormatDescriptionEvent {
    /// Expects the whole event data, including the checksum suffix (if any).
    fn read<T: Read>(data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let binlog_version = input.read_u16::<LittleEndian>()?;

        let mut server_version = [0_u8; Self::SERVER_VER_LEN];
        input.read_exact(&mut server_version[..])?;

        let create_timestamp = input.read_u32::<LittleEndian>()?;
        let event_header_length = input.read_u8()?;

        let mut rest = vec![0_u8; input.get_limit()];
        input.read_exact(&mut rest)?;

        let mut this = Self {
            binlog_version: RawField::new(binlog_version),
            server_version: RawText(RawServerVersion(server_version)),
            create_timestamp,
            event_header_length,
            event_type_header_lengths: Vec::new(),
            checksum_alg: RawField::new(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_UNDEF as u8),
        };

        if this.version_product() >= CHECKSUM_VERSION_PRODUCT_MARIADB {
            // [ header lengths ][ checksum alg: 1 ][ checksum: 4 ]
            let suffix_len = BINLOG_CHECKSUM_ALG_DESC_LEN + BINLOG_CHECKSUM_LEN;
            let table_len = match rest.len().checked_sub(suffix_len) {
                Some(table_len) => table_len,
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "format description event is too short for a checksum suffix",
                    ))
                }
            };
            this.checksum_alg = RawField::new(rest[table_len]);
            rest.truncate(table_len);
        }

        this.event_type_header_lengths = rest;

        Ok(this)
    }
}

impl TryFrom<&[u8]> for FormatDescriptionEvent {
    type Error = io::Error;

    fn try_from(data: &[u8]) -> io::Result<Self> {
        Self::read(data.len(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::consts::EventType;
    use crate::binlog::test_util::{fde_body, header_lengths};

    #[test]
    fn should_read_fde_without_checksum_suffix() {
        let lengths = header_lengths(8, 10);
        let body = fde_body("5.1.73-log", &lengths, None);
        let fde = FormatDescriptionEvent::try_from(&body[..]).unwrap();

        assert_eq!(fde.binlog_version.get(), Ok(BinlogVersion::Version4));
        assert_eq!(fde.server_version.get(), "5.1.73-log");
        assert_eq!(fde.split_version(), (5, 1, 73));
        assert_eq!(fde.event_type_header_lengths, lengths);
        assert_eq!(
            fde.get_checksum_alg(),
            Ok(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_UNDEF)
        );
        assert!(!fde.has_checksum());
        assert!(fde.check_header_length().is_ok());
    }

    #[test]
    fn should_read_fde_with_checksum_suffix() {
        let lengths = header_lengths(8, 10);
        for alg in [
            BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_OFF,
            BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_CRC32,
        ]
        .iter()
        {
            let body = fde_body("10.3.8-MariaDB-log", &lengths, Some(*alg));
            let fde = FormatDescriptionEvent::try_from(&body[..]).unwrap();
            assert_eq!(fde.event_type_header_lengths, lengths);
            assert_eq!(fde.get_checksum_alg(), Ok(*alg));
            assert_eq!(
                fde.has_checksum(),
                *alg == BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_CRC32
            );
        }
    }

    #[test]
    fn should_split_at_mariadb_threshold() {
        let lengths = header_lengths(8, 10);

        let body = fde_body(
            "5.3.0",
            &lengths,
            Some(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_OFF),
        );
        let fde = FormatDescriptionEvent::try_from(&body[..]).unwrap();
        assert_eq!(fde.event_type_header_lengths, lengths);

        // an older server has no suffix, so the whole tail is the table
        let body = fde_body("5.2.99", &lengths, None);
        let fde = FormatDescriptionEvent::try_from(&body[..]).unwrap();
        assert_eq!(fde.event_type_header_lengths, lengths);
    }

    #[test]
    fn should_fail_on_short_fde() {
        let body = fde_body("5.7.0", &[], None);
        let err = FormatDescriptionEvent::try_from(&body[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err = FormatDescriptionEvent::try_from(&body[..20]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn should_reject_header_length() {
        let mut body = fde_body("5.1.73", &header_lengths(8, 10), None);
        body[FormatDescriptionEvent::HEADER_LENGTHS_OFFSET - 1] = 13;
        let fde = FormatDescriptionEvent::try_from(&body[..]).unwrap();
        assert!(matches!(
            fde.check_header_length(),
            Err(BinlogError::UnsupportedHeaderLength(13))
        ));
    }

    #[test]
    fn should_resolve_table_id_len() {
        let fde = FormatDescriptionEvent::try_from(
            &fde_body("5.1.73", &header_lengths(6, 6), None)[..],
        )
        .unwrap();
        assert_eq!(fde.table_id_len(EventType::TABLE_MAP_EVENT as u8), 4);
        assert_eq!(fde.table_id_len(EventType::WRITE_ROWS_EVENT_V1 as u8), 4);

        let fde = FormatDescriptionEvent::try_from(
            &fde_body("5.1.73", &header_lengths(8, 10), None)[..],
        )
        .unwrap();
        assert_eq!(fde.table_id_len(EventType::TABLE_MAP_EVENT as u8), 6);
        assert_eq!(fde.table_id_len(EventType::WRITE_ROWS_EVENT as u8), 6);

        let default = FormatDescriptionEvent::new(BinlogVersion::Version4);
        assert_eq!(default.table_id_len(EventType::TABLE_MAP_EVENT as u8), 6);
        assert_eq!(default.get_event_type_header_length(0), None);
        assert!(!default.has_checksum());
    }
}
