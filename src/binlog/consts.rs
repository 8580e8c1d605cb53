// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use serde::Serialize;

use std::convert::TryFrom;

/// Length of the common event header (binlog version >= 4).
pub const EVENT_HEADER_LEN: usize = 19;

/// A binlog file starts with a Binlog File Header `[ fe 'bin' ]`.
pub const BINLOG_MAGIC: [u8; 4] = [0xfe, b'b', b'i', b'n'];

/// Length of the checksum algorithm description at the end of a format description event.
pub const BINLOG_CHECKSUM_ALG_DESC_LEN: usize = 1;

/// Length of the checksum trailer.
pub const BINLOG_CHECKSUM_LEN: usize = 4;

/// Server version since which the format description event carries a checksum algorithm
/// description (MariaDB 5.3.0).
pub const CHECKSUM_VERSION_SPLIT_MARIADB: (u32, u32, u32) = (5, 3, 0);

/// `CHECKSUM_VERSION_SPLIT_MARIADB` as a version product.
pub const CHECKSUM_VERSION_PRODUCT_MARIADB: u64 = ((CHECKSUM_VERSION_SPLIT_MARIADB.0 as u64)
    * 256
    + CHECKSUM_VERSION_SPLIT_MARIADB.1 as u64)
    * 256
    + CHECKSUM_VERSION_SPLIT_MARIADB.2 as u64;

/// Depending on the MySQL Version that created the binlog the format is slightly different.
#[repr(u16)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub enum BinlogVersion {
    /// MySQL 3.23 - < 4.0.0
    Version1 = 1,
    /// MySQL 4.0.0 - 4.0.1
    Version2,
    /// MySQL 4.0.2 - < 5.0.0
    Version3,
    /// MySQL 5.0.0+
    Version4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown binlog version {}", _0)]
#[repr(transparent)]
pub struct UnknownBinlogVersion(pub u16);

impl From<UnknownBinlogVersion> for u16 {
    fn from(x: UnknownBinlogVersion) -> Self {
        x.0
    }
}

impl TryFrom<u16> for BinlogVersion {
    type Error = UnknownBinlogVersion;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Version1),
            2 => Ok(Self::Version2),
            3 => Ok(Self::Version3),
            4 => Ok(Self::Version4),
            x => Err(UnknownBinlogVersion(x)),
        }
    }
}

/// Binlog Event Type
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub enum EventType {
    /// Ignored event.
    UNKNOWN_EVENT = 0x00,
    /// A start event is the first event of a binlog for binlog-version 1 to 3.
    ///
    /// Superseded by `FORMAT_DESCRIPTION_EVENT` since mysql v5.0.0.
    START_EVENT_V3 = 0x01,
    /// A `QUERY_EVENT` is created for each query that modifies the database,
    /// unless the query is logged row-based.
    QUERY_EVENT = 0x02,
    /// A `STOP_EVENT` has no payload or post-header.
    STOP_EVENT = 0x03,
    /// The rotate event is added to the binlog as last event
    /// to tell the reader what binlog to request next.
    ROTATE_EVENT = 0x04,
    INTVAR_EVENT = 0x05,
    LOAD_EVENT = 0x06,
    /// Ignored event.
    SLAVE_EVENT = 0x07,
    CREATE_FILE_EVENT = 0x08,
    APPEND_BLOCK_EVENT = 0x09,
    EXEC_LOAD_EVENT = 0x0a,
    DELETE_FILE_EVENT = 0x0b,
    NEW_LOAD_EVENT = 0x0c,
    RAND_EVENT = 0x0d,
    USER_VAR_EVENT = 0x0e,
    /// A format description event is the first event of a binlog for binlog-version 4.
    /// It describes how the other events are layed out.
    FORMAT_DESCRIPTION_EVENT = 0x0f,
    XID_EVENT = 0x10,
    BEGIN_LOAD_QUERY_EVENT = 0x11,
    EXECUTE_LOAD_QUERY_EVENT = 0x12,
    TABLE_MAP_EVENT = 0x13,
    /// Rows event v0 (mysql 5.1.0 - 5.1.15).
    PRE_GA_WRITE_ROWS_EVENT = 0x14,
    PRE_GA_UPDATE_ROWS_EVENT = 0x15,
    PRE_GA_DELETE_ROWS_EVENT = 0x16,
    /// Rows event v1 (mariadb and mysql 5.1.15 - 5.6.x).
    WRITE_ROWS_EVENT_V1 = 0x17,
    UPDATE_ROWS_EVENT_V1 = 0x18,
    DELETE_ROWS_EVENT_V1 = 0x19,
    INCIDENT_EVENT = 0x1a,
    HEARTBEAT_EVENT = 0x1b,
    IGNORABLE_EVENT = 0x1c,
    ROWS_QUERY_EVENT = 0x1d,
    /// Rows event v2 (mysql 5.6.x+).
    WRITE_ROWS_EVENT = 0x1e,
    UPDATE_ROWS_EVENT = 0x1f,
    DELETE_ROWS_EVENT = 0x20,
    GTID_EVENT = 0x21,
    ANONYMOUS_GTID_EVENT = 0x22,
    PREVIOUS_GTIDS_EVENT = 0x23,
    TRANSACTION_CONTEXT_EVENT = 0x24,
    VIEW_CHANGE_EVENT = 0x25,
    /// Prepared XA transaction terminal event similar to Xid.
    XA_PREPARE_LOG_EVENT = 0x26,
    /// Extension of UPDATE_ROWS_EVENT, allowing partial values according
    /// to binlog_row_value_options.
    PARTIAL_UPDATE_ROWS_EVENT = 0x27,
    /// MariaDB: query that caused the following rows events.
    MARIADB_ANNOTATE_ROWS_EVENT = 0xa0,
    /// MariaDB: binlog checkpoint for crash recovery.
    MARIADB_BINLOG_CHECKPOINT_EVENT = 0xa1,
    /// MariaDB: global transaction identifier of the following event group.
    MARIADB_GTID_EVENT = 0xa2,
    /// MariaDB: list of the last GTID per replication domain.
    MARIADB_GTID_LIST_EVENT = 0xa3,
    MARIADB_START_ENCRYPTION_EVENT = 0xa4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown event type {}", _0)]
#[repr(transparent)]
pub struct UnknownEventType(pub u8);

impl From<UnknownEventType> for u8 {
    fn from(x: UnknownEventType) -> Self {
        x.0
    }
}

impl TryFrom<u8> for EventType {
    type Error = UnknownEventType;

    fn try_from(byte: u8) -> Result<Self, UnknownEventType> {
        match byte {
            0x00 => Ok(Self::UNKNOWN_EVENT),
            0x01 => Ok(Self::START_EVENT_V3),
            0x02 => Ok(Self::QUERY_EVENT),
            0x03 => Ok(Self::STOP_EVENT),
            0x04 => Ok(Self::ROTATE_EVENT),
            0x05 => Ok(Self::INTVAR_EVENT),
            0x06 => Ok(Self::LOAD_EVENT),
            0x07 => Ok(Self::SLAVE_EVENT),
            0x08 => Ok(Self::CREATE_FILE_EVENT),
            0x09 => Ok(Self::APPEND_BLOCK_EVENT),
            0x0a => Ok(Self::EXEC_LOAD_EVENT),
            0x0b => Ok(Self::DELETE_FILE_EVENT),
            0x0c => Ok(Self::NEW_LOAD_EVENT),
            0x0d => Ok(Self::RAND_EVENT),
            0x0e => Ok(Self::USER_VAR_EVENT),
            0x0f => Ok(Self::FORMAT_DESCRIPTION_EVENT),
            0x10 => Ok(Self::XID_EVENT),
            0x11 => Ok(Self::BEGIN_LOAD_QUERY_EVENT),
            0x12 => Ok(Self::EXECUTE_LOAD_QUERY_EVENT),
            0x13 => Ok(Self::TABLE_MAP_EVENT),
            0x14 => Ok(Self::PRE_GA_WRITE_ROWS_EVENT),
            0x15 => Ok(Self::PRE_GA_UPDATE_ROWS_EVENT),
            0x16 => Ok(Self::PRE_GA_DELETE_ROWS_EVENT),
            0x17 => Ok(Self::WRITE_ROWS_EVENT_V1),
            0x18 => Ok(Self::UPDATE_ROWS_EVENT_V1),
            0x19 => Ok(Self::DELETE_ROWS_EVENT_V1),
            0x1a => Ok(Self::INCIDENT_EVENT),
            0x1b => Ok(Self::HEARTBEAT_EVENT),
            0x1c => Ok(Self::IGNORABLE_EVENT),
            0x1d => Ok(Self::ROWS_QUERY_EVENT),
            0x1e => Ok(Self::WRITE_ROWS_EVENT),
            0x1f => Ok(Self::UPDATE_ROWS_EVENT),
            0x20 => Ok(Self::DELETE_ROWS_EVENT),
            0x21 => Ok(Self::GTID_EVENT),
            0x22 => Ok(Self::ANONYMOUS_GTID_EVENT),
            0x23 => Ok(Self::PREVIOUS_GTIDS_EVENT),
            0x24 => Ok(Self::TRANSACTION_CONTEXT_EVENT),
            0x25 => Ok(Self::VIEW_CHANGE_EVENT),
            0x26 => Ok(Self::XA_PREPARE_LOG_EVENT),
            0x27 => Ok(Self::PARTIAL_UPDATE_ROWS_EVENT),
            0xa0 => Ok(Self::MARIADB_ANNOTATE_ROWS_EVENT),
            0xa1 => Ok(Self::MARIADB_BINLOG_CHECKPOINT_EVENT),
            0xa2 => Ok(Self::MARIADB_GTID_EVENT),
            0xa3 => Ok(Self::MARIADB_GTID_LIST_EVENT),
            0xa4 => Ok(Self::MARIADB_START_ENCRYPTION_EVENT),
            x => Err(UnknownEventType(x)),
        }
    }
}

/// Enumeration spcifying checksum algorithm used to encode a binary log event.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[allow(non_camel_case_types)]
#[repr(u8)]
pub enum BinlogChecksumAlg {
    /// Events are without checksum though its generator is checksum-capable New Master (NM).
    BINLOG_CHECKSUM_ALG_OFF = 0,
    /// CRC32 of zlib algorithm
    BINLOG_CHECKSUM_ALG_CRC32 = 1,
    /// The server that wrote the binlog predates checksums.
    BINLOG_CHECKSUM_ALG_UNDEF = 255,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown checksum algorithm {}", _0)]
#[repr(transparent)]
pub struct UnknownChecksumAlg(pub u8);

impl From<UnknownChecksumAlg> for u8 {
    fn from(x: UnknownChecksumAlg) -> Self {
        x.0
    }
}

impl TryFrom<u8> for BinlogChecksumAlg {
    type Error = UnknownChecksumAlg;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::BINLOG_CHECKSUM_ALG_OFF),
            1 => Ok(Self::BINLOG_CHECKSUM_ALG_CRC32),
            255 => Ok(Self::BINLOG_CHECKSUM_ALG_UNDEF),
            x => Err(UnknownChecksumAlg(x)),
        }
    }
}

/// Type of a column as written into a table map event.
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub enum ColumnType {
    MYSQL_TYPE_DECIMAL = 0,
    MYSQL_TYPE_TINY,
    MYSQL_TYPE_SHORT,
    MYSQL_TYPE_LONG,
    MYSQL_TYPE_FLOAT,
    MYSQL_TYPE_DOUBLE,
    MYSQL_TYPE_NULL,
    MYSQL_TYPE_TIMESTAMP,
    MYSQL_TYPE_LONGLONG,
    MYSQL_TYPE_INT24,
    MYSQL_TYPE_DATE,
    MYSQL_TYPE_TIME,
    MYSQL_TYPE_DATETIME,
    MYSQL_TYPE_YEAR,
    MYSQL_TYPE_NEWDATE,
    MYSQL_TYPE_VARCHAR,
    MYSQL_TYPE_BIT,
    MYSQL_TYPE_TIMESTAMP2,
    MYSQL_TYPE_DATETIME2,
    MYSQL_TYPE_TIME2,
    MYSQL_TYPE_TYPED_ARRAY,
    MYSQL_TYPE_JSON = 245,
    MYSQL_TYPE_NEWDECIMAL,
    MYSQL_TYPE_ENUM,
    MYSQL_TYPE_SET,
    MYSQL_TYPE_TINY_BLOB,
    MYSQL_TYPE_MEDIUM_BLOB,
    MYSQL_TYPE_LONG_BLOB,
    MYSQL_TYPE_BLOB,
    MYSQL_TYPE_VAR_STRING,
    MYSQL_TYPE_STRING,
    MYSQL_TYPE_GEOMETRY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown column type {}", _0)]
#[repr(transparent)]
pub struct UnknownColumnType(pub u8);

impl From<UnknownColumnType> for u8 {
    fn from(x: UnknownColumnType) -> Self {
        x.0
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = UnknownColumnType;

    fn try_from(byte: u8) -> Result<Self, UnknownColumnType> {
        match byte {
            0x00_u8 => Ok(Self::MYSQL_TYPE_DECIMAL),
            0x01_u8 => Ok(Self::MYSQL_TYPE_TINY),
            0x02_u8 => Ok(Self::MYSQL_TYPE_SHORT),
            0x03_u8 => Ok(Self::MYSQL_TYPE_LONG),
            0x04_u8 => Ok(Self::MYSQL_TYPE_FLOAT),
            0x05_u8 => Ok(Self::MYSQL_TYPE_DOUBLE),
            0x06_u8 => Ok(Self::MYSQL_TYPE_NULL),
            0x07_u8 => Ok(Self::MYSQL_TYPE_TIMESTAMP),
            0x08_u8 => Ok(Self::MYSQL_TYPE_LONGLONG),
            0x09_u8 => Ok(Self::MYSQL_TYPE_INT24),
            0x0a_u8 => Ok(Self::MYSQL_TYPE_DATE),
            0x0b_u8 => Ok(Self::MYSQL_TYPE_TIME),
            0x0c_u8 => Ok(Self::MYSQL_TYPE_DATETIME),
            0x0d_u8 => Ok(Self::MYSQL_TYPE_YEAR),
            0x0e_u8 => Ok(Self::MYSQL_TYPE_NEWDATE),
            0x0f_u8 => Ok(Self::MYSQL_TYPE_VARCHAR),
            0x10_u8 => Ok(Self::MYSQL_TYPE_BIT),
            0x11_u8 => Ok(Self::MYSQL_TYPE_TIMESTAMP2),
            0x12_u8 => Ok(Self::MYSQL_TYPE_DATETIME2),
            0x13_u8 => Ok(Self::MYSQL_TYPE_TIME2),
            0x14_u8 => Ok(Self::MYSQL_TYPE_TYPED_ARRAY),
            0xf5_u8 => Ok(Self::MYSQL_TYPE_JSON),
            0xf6_u8 => Ok(Self::MYSQL_TYPE_NEWDECIMAL),
            0xf7_u8 => Ok(Self::MYSQL_TYPE_ENUM),
            0xf8_u8 => Ok(Self::MYSQL_TYPE_SET),
            0xf9_u8 => Ok(Self::MYSQL_TYPE_TINY_BLOB),
            0xfa_u8 => Ok(Self::MYSQL_TYPE_MEDIUM_BLOB),
            0xfb_u8 => Ok(Self::MYSQL_TYPE_LONG_BLOB),
            0xfc_u8 => Ok(Self::MYSQL_TYPE_BLOB),
            0xfd_u8 => Ok(Self::MYSQL_TYPE_VAR_STRING),
            0xfe_u8 => Ok(Self::MYSQL_TYPE_STRING),
            0xff_u8 => Ok(Self::MYSQL_TYPE_GEOMETRY),
            x => Err(UnknownColumnType(x)),
        }
    }
}

impl ColumnType {
    /// Returns the length of type-specific metadata of this column type in a table map event.
    ///
    /// Legacy `DECIMAL` has no metadata.
    pub fn get_metadata_len(&self) -> usize {
        match self {
            Self::MYSQL_TYPE_FLOAT
            | Self::MYSQL_TYPE_DOUBLE
            | Self::MYSQL_TYPE_TINY_BLOB
            | Self::MYSQL_TYPE_MEDIUM_BLOB
            | Self::MYSQL_TYPE_LONG_BLOB
            | Self::MYSQL_TYPE_BLOB
            | Self::MYSQL_TYPE_JSON
            | Self::MYSQL_TYPE_GEOMETRY
            | Self::MYSQL_TYPE_TIMESTAMP2
            | Self::MYSQL_TYPE_DATETIME2
            | Self::MYSQL_TYPE_TIME2 => 1,
            Self::MYSQL_TYPE_NEWDECIMAL
            | Self::MYSQL_TYPE_VARCHAR
            | Self::MYSQL_TYPE_VAR_STRING
            | Self::MYSQL_TYPE_STRING
            | Self::MYSQL_TYPE_BIT
            | Self::MYSQL_TYPE_ENUM
            | Self::MYSQL_TYPE_SET => 2,
            _ => 0,
        }
    }

    /// Returns `true` for types that are covered by the `SIGNEDNESS` optional metadata.
    pub fn is_numeric_type(&self) -> bool {
        matches!(
            self,
            Self::MYSQL_TYPE_TINY
                | Self::MYSQL_TYPE_SHORT
                | Self::MYSQL_TYPE_INT24
                | Self::MYSQL_TYPE_LONG
                | Self::MYSQL_TYPE_LONGLONG
                | Self::MYSQL_TYPE_NEWDECIMAL
                | Self::MYSQL_TYPE_FLOAT
                | Self::MYSQL_TYPE_DOUBLE
        )
    }
}

/// Variants of this enum describe how LOAD DATA handles duplicates.
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub enum LoadDuplicateHandling {
    LOAD_DUP_ERROR = 0,
    LOAD_DUP_IGNORE,
    LOAD_DUP_REPLACE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Unknown duplicate handling variant {}", _0)]
#[repr(transparent)]
pub struct UnknownDuplicateHandling(pub u8);

impl From<UnknownDuplicateHandling> for u8 {
    fn from(x: UnknownDuplicateHandling) -> Self {
        x.0
    }
}

impl TryFrom<u8> for LoadDuplicateHandling {
    type Error = UnknownDuplicateHandling;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::LOAD_DUP_ERROR),
            1 => Ok(Self::LOAD_DUP_IGNORE),
            2 => Ok(Self::LOAD_DUP_REPLACE),
            x => Err(UnknownDuplicateHandling(x)),
        }
    }
}

my_bitflags! {
    EventFlags, u16,

    /// Binlog Event Flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u16 {
        /// Gets unset in the `FORMAT_DESCRIPTION_EVENT`
        /// when the file gets closed to detect broken binlogs.
        const LOG_EVENT_BINLOG_IN_USE_F = 0x0001;

        /// Unused.
        const LOG_EVENT_FORCED_ROTATE_F = 0x0002;

        /// event is thread specific (`CREATE TEMPORARY TABLE` ...).
        const LOG_EVENT_THREAD_SPECIFIC_F = 0x0004;

        /// Event doesn't need default database to be updated (`CREATE DATABASE`, ...).
        const LOG_EVENT_SUPPRESS_USE_F = 0x0008;

        /// Unused.
        const LOG_EVENT_UPDATE_TABLE_MAP_VERSION_F = 0x0010;

        /// Event is created by the slaves SQL-thread and shouldn't update the master-log pos.
        const LOG_EVENT_ARTIFICIAL_F = 0x0020;

        /// Event is created by the slaves IO-thread when written to the relay log.
        const LOG_EVENT_RELAY_LOG_F = 0x0040;

        /// Setting this flag will mark an event as Ignorable.
        const LOG_EVENT_IGNORABLE_F = 0x0080;

        /// Events with this flag are not filtered (e.g. on the current
        /// database) and are always written to the binary log regardless of
        /// filters.
        const LOG_EVENT_NO_FILTER_F = 0x0100;

        /// MTS: group of events can be marked to force its execution in isolation from
        /// any other Workers.
        const LOG_EVENT_MTS_ISOLATE_F = 0x0200;
    }
}

my_bitflags! {
    RowsEventFlags, u16,

    /// Rows event flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RowsEventFlags: u16 {
        /// Last event of a statement.
        const STMT_END = 0x0001;
        /// No foreign key checks.
        const NO_FOREIGN_KEY_CHECKS   = 0x0002;
        /// No unique key checks.
        const RELAXED_UNIQUE_CHECKS  = 0x0004;
        /// Indicates that rows in this event are complete,
        /// that is contain values for all columns of the table.
        const COMPLETE_ROWS = 0x0008;
    }
}
