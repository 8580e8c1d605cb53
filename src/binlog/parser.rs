// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Sequential binlog decoder.

use serde::Serialize;
use tracing::{debug, trace, warn};

use std::{
    cmp::max,
    collections::HashMap,
    fmt,
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    iter::FusedIterator,
    path::Path,
    sync::Arc,
};

use super::{
    consts::{BinlogVersion, BINLOG_CHECKSUM_LEN, BINLOG_MAGIC},
    error::BinlogError,
    events::{
        AnnotateRowsEvent, BeginLoadQueryEvent, BinlogCheckpointEvent, ExecuteLoadQueryEvent,
        FormatDescriptionEvent, MariadbGtidEvent, MariadbGtidListEvent, QueryEvent, RotateEvent,
        RowsEvent, RowsQueryEvent, TableMapEvent, XidEvent,
    },
    header::{BinlogEventHeader, BinlogFileHeader},
    registry::{EventDecoder, EventRegistry},
    BinlogStruct,
};

/// Options of a [`BinlogParser`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ParserOptions {
    permissive: bool,
    binlog_version: BinlogVersion,
}

impl ParserOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// If `true`, an event whose body fails to decode is emitted as [`EventData::Generic`]
    /// instead of terminating the stream (defaults to `false`).
    ///
    /// Header errors, a short read of a body, and io errors are always fatal.
    pub fn with_permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }

    /// Binlog version of the format description event used before the stream's own
    /// one is seen (defaults to `Version4`).
    pub fn with_binlog_version(mut self, binlog_version: BinlogVersion) -> Self {
        self.binlog_version = binlog_version;
        self
    }

    /// Returns the value of the `permissive` option.
    pub fn permissive(&self) -> bool {
        self.permissive
    }

    /// Returns the value of the `binlog_version` option.
    pub fn binlog_version(&self) -> BinlogVersion {
        self.binlog_version
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            permissive: false,
            binlog_version: BinlogVersion::Version4,
        }
    }
}

/// Hook that receives the text of every decoded query.
///
/// It doesn't affect decoding.
pub trait SqlFilter {
    fn filter_sql(&mut self, sql: &str);
}

impl<F> SqlFilter for F
where
    F: FnMut(&str),
{
    fn filter_sql(&mut self, sql: &str) {
        (self)(sql)
    }
}

/// Decoded binlog event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub header: BinlogEventHeader,
    pub data: EventData,
}

/// Decoded event data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventData {
    FormatDescriptionEvent(FormatDescriptionEvent),
    RotateEvent(RotateEvent),
    QueryEvent(QueryEvent),
    XidEvent(XidEvent),
    BeginLoadQueryEvent(BeginLoadQueryEvent),
    ExecuteLoadQueryEvent(ExecuteLoadQueryEvent),
    RowsQueryEvent(RowsQueryEvent),
    /// The same table map event is cached by the parser.
    TableMapEvent(Arc<TableMapEvent>),
    RowsEvent(RowsEvent),
    AnnotateRowsEvent(AnnotateRowsEvent),
    BinlogCheckpointEvent(BinlogCheckpointEvent),
    MariadbGtidEvent(MariadbGtidEvent),
    MariadbGtidListEvent(MariadbGtidListEvent),
    /// Raw body (without checksum) of an event that isn't decoded by this implementation.
    Generic(Vec<u8>),
}

/// Stateful binlog decoder.
///
/// Keeps the current format description event and the table map cache, so events must be
/// decoded in the stream order.
pub struct BinlogParser {
    fde: FormatDescriptionEvent,
    registry: EventRegistry,
    tables: HashMap<u64, Arc<TableMapEvent>>,
    options: ParserOptions,
    sql_filter: Option<Box<dyn SqlFilter>>,
}

impl fmt::Debug for BinlogParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinlogParser")
            .field("fde", &self.fde)
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .field("sql_filter", &self.sql_filter.is_some())
            .finish()
    }
}

impl Default for BinlogParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl BinlogParser {
    /// Creates a parser that uses a default format description event until the stream's
    /// own one is seen.
    pub fn new(options: ParserOptions) -> Self {
        let fde = FormatDescriptionEvent::new(options.binlog_version);
        Self {
            registry: EventRegistry::new(&fde),
            fde,
            tables: HashMap::new(),
            options,
            sql_filter: None,
        }
    }

    /// Installs a hook that receives the text of every decoded query.
    pub fn with_sql_filter<F: SqlFilter + 'static>(mut self, filter: F) -> Self {
        self.sql_filter = Some(Box::new(filter));
        self
    }

    /// Returns the current format description event.
    pub fn fde(&self) -> &FormatDescriptionEvent {
        &self.fde
    }

    /// Returns parser options.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Returns the cached table map event of the given table.
    pub fn get_table(&self, table_id: u64) -> Option<&Arc<TableMapEvent>> {
        self.tables.get(&table_id)
    }

    /// Reads and decodes the next event from the given stream.
    ///
    /// Returns `None` at a clean end of the stream.
    pub fn next_event<T: Read>(&mut self, mut input: T) -> Result<Option<Event>, BinlogError> {
        let header = match BinlogEventHeader::read(&mut input)? {
            Some(header) => header,
            None => return Ok(None),
        };

        trace!(
            event_type = header.event_type.0,
            event_size = header.event_size,
            log_pos = header.log_pos,
            "event header"
        );

        // event size comes from the stream, so the body grows as it is read
        let data_len = header.data_len();
        let mut body = Vec::new();
        (&mut input).take(data_len as u64).read_to_end(&mut body)?;
        if body.len() < data_len {
            return Err(BinlogError::TruncatedBody {
                event_type: header.event_type.0,
                len: data_len,
            });
        }

        let data = self.decode_event(&header, body)?;
        Ok(Some(Event { header, data }))
    }

    /// Decodes an event body (including the checksum trailer, if any).
    pub fn decode_event(
        &mut self,
        header: &BinlogEventHeader,
        mut body: Vec<u8>,
    ) -> Result<EventData, BinlogError> {
        let event_type = header.event_type.0;
        let decoder = self.registry.get(event_type);

        if decoder == EventDecoder::FormatDescription {
            return self.adopt_fde(event_type, &body);
        }

        if self.registry.has_checksum() {
            let len = body
                .len()
                .checked_sub(BINLOG_CHECKSUM_LEN)
                .ok_or(BinlogError::TruncatedBody {
                    event_type,
                    len: body.len(),
                })?;
            body.truncate(len);
        }

        match self.decode_body(decoder, header, &body) {
            Ok(data) => Ok(data),
            Err(err) if self.options.permissive && err.is_body_error() => {
                warn!(
                    event_type,
                    log_pos = header.log_pos,
                    error = %err,
                    "failed to decode event body, passing it through"
                );
                Ok(EventData::Generic(body))
            }
            Err(err) => Err(err),
        }
    }

    fn adopt_fde(&mut self, event_type: u8, body: &[u8]) -> Result<EventData, BinlogError> {
        let fde = FormatDescriptionEvent::read(body.len(), body)
            .map_err(|err| BinlogError::from_body_io(err, event_type, body.len()))?;
        fde.check_header_length()?;

        debug!(
            server_version = %fde.server_version.get(),
            checksum_alg = ?fde.get_checksum_alg(),
            header_lengths = fde.event_type_header_lengths.len(),
            "format description event adopted"
        );

        self.registry = EventRegistry::new(&fde);
        self.fde = fde.clone();

        Ok(EventData::FormatDescriptionEvent(fde))
    }

    fn decode_body(
        &mut self,
        decoder: EventDecoder,
        header: &BinlogEventHeader,
        body: &[u8],
    ) -> Result<EventData, BinlogError> {
        let event_type = header.event_type.0;
        let len = body.len();
        let truncated = |err: io::Error| BinlogError::from_body_io(err, event_type, len);

        let data = match decoder {
            EventDecoder::FormatDescription => return self.adopt_fde(event_type, body),
            EventDecoder::Rotate => EventData::RotateEvent(read_struct(body).map_err(truncated)?),
            EventDecoder::Query => {
                let event: QueryEvent = read_struct(body).map_err(truncated)?;
                self.filter_sql(&event.query.get());
                EventData::QueryEvent(event)
            }
            EventDecoder::Xid => EventData::XidEvent(read_struct(body).map_err(truncated)?),
            EventDecoder::BeginLoadQuery => {
                EventData::BeginLoadQueryEvent(read_struct(body).map_err(truncated)?)
            }
            EventDecoder::ExecuteLoadQuery => {
                let event: ExecuteLoadQueryEvent = read_struct(body).map_err(truncated)?;
                self.filter_sql(&event.query.get());
                EventData::ExecuteLoadQueryEvent(event)
            }
            EventDecoder::RowsQuery => {
                EventData::RowsQueryEvent(read_struct(body).map_err(truncated)?)
            }
            EventDecoder::TableMap { table_id_len } => {
                let table = TableMapEvent::read(table_id_len, len, body).map_err(truncated)?;
                let table = Arc::new(table);
                let table_id = table.table_id;
                match self.tables.insert(table_id, table.clone()) {
                    Some(_) => debug!(table_id, table = %table.table_name.get(), "table map replaced"),
                    None => debug!(table_id, table = %table.table_name.get(), "table map cached"),
                }
                EventData::TableMapEvent(table)
            }
            EventDecoder::Rows(spec) => EventData::RowsEvent(RowsEvent::read(spec, &self.tables, body)?),
            EventDecoder::AnnotateRows => {
                EventData::AnnotateRowsEvent(read_struct(body).map_err(truncated)?)
            }
            EventDecoder::BinlogCheckpoint => {
                EventData::BinlogCheckpointEvent(read_struct(body).map_err(truncated)?)
            }
            EventDecoder::MariadbGtid => {
                let mut event: MariadbGtidEvent = read_struct(body).map_err(truncated)?;
                event.server_id = header.server_id;
                EventData::MariadbGtidEvent(event)
            }
            EventDecoder::MariadbGtidList => {
                EventData::MariadbGtidListEvent(read_struct(body).map_err(truncated)?)
            }
            EventDecoder::Generic => {
                if let Err(unknown) = header.event_type.get() {
                    debug!(event_type = unknown.0, len, "unknown event type, passing it through");
                }
                EventData::Generic(body.to_vec())
            }
        };

        Ok(data)
    }

    fn filter_sql(&mut self, sql: &str) {
        if let Some(filter) = self.sql_filter.as_mut() {
            filter.filter_sql(sql);
        }
    }
}

fn read_struct<S: BinlogStruct>(body: &[u8]) -> io::Result<S> {
    S::read(body.len(), body)
}

/// Binlog file.
///
/// It's an iterator over events in a binlog file. Iteration stops after the first error.
#[derive(Debug)]
pub struct BinlogFile<T> {
    parser: BinlogParser,
    read: T,
    done: bool,
}

impl<T: Read> BinlogFile<T> {
    /// Creates new binlog file.
    ///
    /// It'll try to read binlog file header.
    pub fn new(read: T) -> Result<Self, BinlogError> {
        Self::with_parser(read, BinlogParser::default())
    }

    /// Creates new binlog file decoded with the given parser.
    ///
    /// It'll try to read binlog file header.
    pub fn with_parser(mut read: T, parser: BinlogParser) -> Result<Self, BinlogError> {
        BinlogFileHeader::read(&mut read)?;
        Ok(Self {
            parser,
            read,
            done: false,
        })
    }

    /// Returns the underlying parser.
    pub fn parser(&self) -> &BinlogParser {
        &self.parser
    }
}

impl BinlogFile<BufReader<File>> {
    /// Opens a binlog file and positions it at `offset` (at least right after the magic).
    ///
    /// Events before `offset` are skipped, so a format description event isn't seen
    /// if `offset` points past it.
    pub fn open<P: AsRef<Path>>(
        path: P,
        offset: u64,
        parser: BinlogParser,
    ) -> Result<Self, BinlogError> {
        let mut read = BufReader::new(File::open(path)?);
        BinlogFileHeader::read(&mut read)?;
        read.seek(SeekFrom::Start(max(offset, BINLOG_MAGIC.len() as u64)))?;
        Ok(Self {
            parser,
            read,
            done: false,
        })
    }
}

impl<T: Read> Iterator for BinlogFile<T> {
    type Item = Result<Event, BinlogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.parser.next_event(&mut self.read) {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<T: Read> FusedIterator for BinlogFile<T> {}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::binlog::{
        consts::{BinlogChecksumAlg, ColumnType, EventType},
        test_util::{
            event, event_header, fde_body, header_lengths, query_body, rows_body, stream,
            table_map_body, xid_body,
        },
        value::BinlogValue,
    };

    fn fde_event(checksum: bool) -> Vec<u8> {
        let alg = if checksum {
            BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_CRC32
        } else {
            BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_OFF
        };
        // fde itself is never stripped, its checksum is a part of the body
        event(
            EventType::FORMAT_DESCRIPTION_EVENT,
            &fde_body("5.7.0", &header_lengths(8, 10), Some(alg)),
            false,
        )
    }

    fn table_map_event(checksum: bool) -> Vec<u8> {
        let body = table_map_body(
            1,
            6,
            "test",
            "t",
            &[
                (ColumnType::MYSQL_TYPE_LONG, &[]),
                (ColumnType::MYSQL_TYPE_VARCHAR, &[0x40, 0x00]),
            ],
            &[0b10],
            &[],
        );
        event(EventType::TABLE_MAP_EVENT, &body, checksum)
    }

    fn write_rows_event(checksum: bool) -> Vec<u8> {
        let mut row = vec![0b00];
        row.extend_from_slice(&42_i32.to_le_bytes());
        row.extend_from_slice(b"\x02ok");
        let body = rows_body(1, 6, 2, 2, &[0b11], None, &row);
        event(EventType::WRITE_ROWS_EVENT, &body, checksum)
    }

    fn scenario(checksum: bool) -> Vec<u8> {
        stream(&[
            fde_event(checksum),
            table_map_event(checksum),
            write_rows_event(checksum),
            event(EventType::XID_EVENT, &xid_body(99), checksum),
        ])
    }

    fn decode_all(data: &[u8]) -> Vec<EventData> {
        BinlogFile::new(data)
            .unwrap()
            .map(|event| event.unwrap().data)
            .collect()
    }

    #[test]
    fn should_reject_bad_magic() {
        let mut data = scenario(false);
        data[1] = b'x';
        assert!(matches!(
            BinlogFile::new(&data[..]),
            Err(BinlogError::BadMagic(_))
        ));
        assert!(matches!(
            BinlogFile::new(&b""[..]),
            Err(BinlogError::BadMagic(_))
        ));
    }

    #[test]
    fn should_decode_end_to_end_scenario() {
        let events = decode_all(&scenario(false));
        assert_eq!(events.len(), 4);

        match &events[0] {
            EventData::FormatDescriptionEvent(fde) => {
                assert_eq!(fde.server_version.get(), "5.7.0");
                assert!(!fde.has_checksum());
            }
            other => panic!("unexpected event {:?}", other),
        }

        match &events[1] {
            EventData::TableMapEvent(table) => {
                assert_eq!(table.table_id, 1);
                assert_eq!(table.get_columns_count(), 2);
            }
            other => panic!("unexpected event {:?}", other),
        }

        match &events[2] {
            EventData::RowsEvent(rows) => {
                assert_eq!(rows.table_id, 1);
                assert_eq!(rows.rows.len(), 1);
                assert_eq!(
                    rows.rows[0].after,
                    Some(vec![BinlogValue::Int(42), BinlogValue::Text("ok".into())])
                );
                assert_eq!(rows.rows[0].before, None);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(events[3], EventData::XidEvent(XidEvent { xid: 99 }));
    }

    #[test]
    fn should_strip_checksum_trailer() {
        let plain = decode_all(&scenario(false));
        let checksummed = decode_all(&scenario(true));
        assert_eq!(plain.len(), checksummed.len());

        // everything but the fde must decode into the same values
        assert_eq!(plain[1..], checksummed[1..]);
        match &checksummed[0] {
            EventData::FormatDescriptionEvent(fde) => assert!(fde.has_checksum()),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn should_fail_on_unknown_table() {
        let data = stream(&[fde_event(false), write_rows_event(false)]);
        let mut file = BinlogFile::new(&data[..]).unwrap();
        assert!(file.next().unwrap().is_ok());
        assert!(matches!(
            file.next(),
            Some(Err(BinlogError::UnknownTable(1)))
        ));
        assert!(file.next().is_none());

        let data = stream(&[fde_event(false), table_map_event(false), write_rows_event(false)]);
        let events = decode_all(&data);
        assert!(matches!(events[2], EventData::RowsEvent(_)));
    }

    #[test]
    fn should_pass_unknown_table_through_in_permissive_mode() {
        let data = stream(&[
            fde_event(false),
            write_rows_event(false),
            event(EventType::XID_EVENT, &xid_body(7), false),
        ]);
        let parser = BinlogParser::new(ParserOptions::new().with_permissive(true));
        let events = BinlogFile::with_parser(&data[..], parser)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(events.len(), 3);
        assert!(matches!(events[1].data, EventData::Generic(_)));
        assert_eq!(events[2].data, EventData::XidEvent(XidEvent { xid: 7 }));
    }

    #[test]
    fn should_fail_on_malformed_header() {
        let mut data = stream(&[fde_event(false)]);
        data.extend_from_slice(&event_header(EventType::XID_EVENT as u8, 0, 1, 10, 0));
        let mut file = BinlogFile::new(&data[..]).unwrap();
        assert!(file.next().unwrap().is_ok());
        assert!(matches!(
            file.next(),
            Some(Err(BinlogError::MalformedHeader(_)))
        ));
        assert!(file.next().is_none());
    }

    #[test]
    fn should_fail_on_truncated_body() {
        let mut data = scenario(false);
        data.truncate(data.len() - 3);
        let results = BinlogFile::new(&data[..]).unwrap().collect::<Vec<_>>();
        assert_eq!(results.len(), 4);
        assert!(matches!(
            results[3],
            Err(BinlogError::TruncatedBody { event_type: 0x10, .. })
        ));
    }

    #[test]
    fn should_reject_header_length() {
        let mut body = fde_body("5.7.0", &header_lengths(8, 10), None);
        body[FormatDescriptionEvent::HEADER_LENGTHS_OFFSET - 1] = 13;
        let data = stream(&[event(EventType::FORMAT_DESCRIPTION_EVENT, &body, false)]);
        assert!(matches!(
            BinlogFile::new(&data[..]).unwrap().next(),
            Some(Err(BinlogError::UnsupportedHeaderLength(13)))
        ));
    }

    #[test]
    fn should_pass_unknown_events_through() {
        let data = stream(&[
            fde_event(false),
            event(EventType::INTVAR_EVENT, &[1, 2, 3, 4, 5, 6, 7, 8, 9], false),
        ]);
        let mut data = data;
        let mut unknown = event(EventType::XID_EVENT, b"opaque", false);
        unknown[4] = 0x42;
        data.extend_from_slice(&unknown);

        let events = decode_all(&data);
        assert_eq!(events[1], EventData::Generic(vec![1, 2, 3, 4, 5, 6, 7, 8, 9]));
        assert_eq!(events[2], EventData::Generic(b"opaque".to_vec()));
    }

    #[test]
    fn should_call_sql_filter() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let parser = BinlogParser::default().with_sql_filter({
            let seen = seen.clone();
            move |sql: &str| seen.borrow_mut().push(sql.to_owned())
        });

        let data = stream(&[
            fde_event(false),
            event(EventType::QUERY_EVENT, &query_body(1, "test", &[], "BEGIN"), false),
            event(EventType::XID_EVENT, &xid_body(1), false),
        ]);
        let events = BinlogFile::with_parser(&data[..], parser)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(*seen.borrow(), vec!["BEGIN".to_owned()]);
    }

    #[test]
    fn should_attach_header_server_id_to_mariadb_gtid() {
        let mut body = 5_u64.to_le_bytes().to_vec();
        body.extend_from_slice(&2_u32.to_le_bytes());
        body.push(0);
        let mut gtid = event(EventType::MARIADB_GTID_EVENT, &body, false);
        // server id of the header
        gtid[5..9].copy_from_slice(&3_u32.to_le_bytes());

        let data = stream(&[
            event(
                EventType::FORMAT_DESCRIPTION_EVENT,
                &fde_body("10.5.8-MariaDB", &header_lengths(8, 10), Some(BinlogChecksumAlg::BINLOG_CHECKSUM_ALG_OFF)),
                false,
            ),
            gtid,
        ]);
        match &decode_all(&data)[1] {
            EventData::MariadbGtidEvent(event) => assert_eq!(event.gtid_string(), "2-3-5"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn should_use_default_fde_before_the_first_one() {
        let data = stream(&[
            table_map_event(false),
            write_rows_event(false),
        ]);
        let events = decode_all(&data);
        assert!(matches!(events[1], EventData::RowsEvent(_)));
    }

    #[test]
    fn should_open_file_at_offset() {
        let data = scenario(false);
        let path = std::env::temp_dir().join(format!("binlog_events_{}.bin", std::process::id()));
        std::fs::write(&path, &data).unwrap();

        let events = BinlogFile::open(&path, 0, BinlogParser::default())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(events.len(), 4);

        // skip the fde
        let offset = 4 + fde_event(false).len() as u64;
        let events = BinlogFile::open(&path, offset, BinlogParser::default())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0].data, EventData::TableMapEvent(_)));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn should_serialize_events_to_json() {
        let data = scenario(false);
        let events = BinlogFile::new(&data[..])
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let json = serde_json::to_value(&events[2]).unwrap();
        assert_eq!(json["header"]["event_type"], 0x1e);
        assert_eq!(
            json["data"]["RowsEvent"]["rows"][0]["after"],
            serde_json::json!([42, "ok"])
        );
        assert_eq!(json["data"]["RowsEvent"]["kind"], "Write");

        let json = serde_json::to_value(&events[3]).unwrap();
        assert_eq!(json["data"]["XidEvent"]["xid"], 99);
    }
}
