// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Event type code to decoder mapping.

use std::convert::TryFrom;

use super::{
    consts::EventType,
    events::{FormatDescriptionEvent, RowsEventKind, RowsEventSpec},
};

/// Decoder of an event body together with the parameters it needs.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventDecoder {
    FormatDescription,
    Rotate,
    Query,
    Xid,
    BeginLoadQuery,
    ExecuteLoadQuery,
    RowsQuery,
    TableMap { table_id_len: usize },
    Rows(RowsEventSpec),
    AnnotateRows,
    BinlogCheckpoint,
    MariadbGtid,
    MariadbGtidList,
    /// Body is kept as is.
    Generic,
}

/// Lookup table of decoders for every event type code.
///
/// Built from a format description event, so it must be rebuilt whenever
/// a new format description event is seen.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EventRegistry {
    decoders: Vec<EventDecoder>,
    has_checksum: bool,
}

impl EventRegistry {
    /// Builds decoders for the given format description event.
    pub fn new(fde: &FormatDescriptionEvent) -> Self {
        let decoders = (0..=u8::MAX)
            .map(|code| match EventType::try_from(code) {
                Ok(event_type) => Self::decoder(fde, event_type),
                Err(_) => EventDecoder::Generic,
            })
            .collect();

        Self {
            decoders,
            has_checksum: fde.has_checksum(),
        }
    }

    fn decoder(fde: &FormatDescriptionEvent, event_type: EventType) -> EventDecoder {
        use EventType::*;
        use RowsEventKind::*;

        let rows = |kind, version, has_after_bitmap| {
            EventDecoder::Rows(RowsEventSpec {
                event_type: event_type as u8,
                kind,
                version,
                table_id_len: fde.table_id_len(event_type as u8),
                has_after_bitmap,
            })
        };

        match event_type {
            FORMAT_DESCRIPTION_EVENT => EventDecoder::FormatDescription,
            ROTATE_EVENT => EventDecoder::Rotate,
            QUERY_EVENT => EventDecoder::Query,
            XID_EVENT => EventDecoder::Xid,
            BEGIN_LOAD_QUERY_EVENT => EventDecoder::BeginLoadQuery,
            EXECUTE_LOAD_QUERY_EVENT => EventDecoder::ExecuteLoadQuery,
            ROWS_QUERY_EVENT => EventDecoder::RowsQuery,
            TABLE_MAP_EVENT => EventDecoder::TableMap {
                table_id_len: fde.table_id_len(event_type as u8),
            },
            PRE_GA_WRITE_ROWS_EVENT => rows(Write, 0, false),
            PRE_GA_UPDATE_ROWS_EVENT => rows(Update, 0, false),
            PRE_GA_DELETE_ROWS_EVENT => rows(Delete, 0, false),
            WRITE_ROWS_EVENT_V1 => rows(Write, 1, false),
            UPDATE_ROWS_EVENT_V1 => rows(Update, 1, true),
            DELETE_ROWS_EVENT_V1 => rows(Delete, 1, false),
            WRITE_ROWS_EVENT => rows(Write, 2, false),
            UPDATE_ROWS_EVENT => rows(Update, 2, true),
            DELETE_ROWS_EVENT => rows(Delete, 2, false),
            MARIADB_ANNOTATE_ROWS_EVENT => EventDecoder::AnnotateRows,
            MARIADB_BINLOG_CHECKPOINT_EVENT => EventDecoder::BinlogCheckpoint,
            MARIADB_GTID_EVENT => EventDecoder::MariadbGtid,
            MARIADB_GTID_LIST_EVENT => EventDecoder::MariadbGtidList,
            _ => EventDecoder::Generic,
        }
    }

    /// Returns the decoder of the given event type code.
    pub fn get(&self, event_type: u8) -> EventDecoder {
        self.decoders[usize::from(event_type)]
    }

    /// Returns `true` if non-fde event bodies end with a CRC32 checksum.
    pub fn has_checksum(&self) -> bool {
        self.has_checksum
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;
    use crate::binlog::{
        consts::{BinlogChecksumAlg, BinlogVersion},
        test_util::{fde_body, header_lengths},
    };

    fn build_registry(table_map: u8, rows: u8, alg: Option<BinlogChecksumAlg>) -> EventRegistry {
        // servers older than 5.3.0 don't write the checksum algorithm
        let version = if alg.is_some() { "5.7.30-log" } else { "5.1.73-log" };
        let body = fde_body(version, &header_lengths(table_map, rows), alg);
        EventRegistry::new(&FormatDescriptionEvent::try_from(&body[..]).unwrap())
    }

    fn rows_spec(registry: &EventRegistry, event_type: EventType) -> RowsEventSpec {
        match registry.get(event_type as u8) {
            EventDecoder::Rows(spec) => spec,
            other => panic!("unexpected decoder {:?}", other),
        }
    }

    #[test]
    fn should_select_rows_layout() {
        let registry = build_registry(8, 10, Some(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_OFF));

        let spec = rows_spec(&registry, EventType::UPDATE_ROWS_EVENT);
        assert_eq!((spec.kind, spec.version), (RowsEventKind::Update, 2));
        assert!(spec.has_after_bitmap);

        let spec = rows_spec(&registry, EventType::WRITE_ROWS_EVENT);
        assert_eq!((spec.kind, spec.version), (RowsEventKind::Write, 2));
        assert!(!spec.has_after_bitmap);

        let spec = rows_spec(&registry, EventType::UPDATE_ROWS_EVENT_V1);
        assert_eq!(spec.version, 1);
        assert!(spec.has_after_bitmap);

        let spec = rows_spec(&registry, EventType::DELETE_ROWS_EVENT_V1);
        assert_eq!((spec.kind, spec.version), (RowsEventKind::Delete, 1));
        assert!(!spec.has_after_bitmap);

        let spec = rows_spec(&registry, EventType::PRE_GA_UPDATE_ROWS_EVENT);
        assert_eq!(spec.version, 0);
        assert!(!spec.has_after_bitmap);
    }

    #[test]
    fn should_resolve_table_id_width() {
        let registry = build_registry(6, 6, None);
        assert_eq!(
            registry.get(EventType::TABLE_MAP_EVENT as u8),
            EventDecoder::TableMap { table_id_len: 4 }
        );
        assert_eq!(rows_spec(&registry, EventType::WRITE_ROWS_EVENT).table_id_len, 4);

        let registry = build_registry(8, 10, None);
        assert_eq!(
            registry.get(EventType::TABLE_MAP_EVENT as u8),
            EventDecoder::TableMap { table_id_len: 6 }
        );
        assert_eq!(rows_spec(&registry, EventType::WRITE_ROWS_EVENT).table_id_len, 6);
    }

    #[test]
    fn should_fall_back_to_generic_decoder() {
        let registry = EventRegistry::new(&FormatDescriptionEvent::new(BinlogVersion::Version4));
        assert_eq!(registry.get(EventType::INTVAR_EVENT as u8), EventDecoder::Generic);
        assert_eq!(registry.get(EventType::GTID_EVENT as u8), EventDecoder::Generic);
        assert_eq!(registry.get(0x42), EventDecoder::Generic);
        assert_eq!(registry.get(0xff), EventDecoder::Generic);
        assert_eq!(registry.get(EventType::ROTATE_EVENT as u8), EventDecoder::Rotate);
        assert_eq!(
            registry.get(EventType::MARIADB_GTID_LIST_EVENT as u8),
            EventDecoder::MariadbGtidList
        );
        assert!(!registry.has_checksum());
    }

    #[test]
    fn should_follow_checksum_alg() {
        assert!(build_registry(8, 10, Some(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_CRC32)).has_checksum());
        assert!(!build_registry(8, 10, Some(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_OFF)).has_checksum());
    }
}
