// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use bitvec::{order::Lsb0, vec::BitVec};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use std::{collections::HashMap, io, sync::Arc};

use super::TableMapEvent;
use crate::{
    binlog::{
        consts::RowsEventFlags,
        error::BinlogError,
        value::{read_value, BinlogValue},
    },
    io::ReadMysqlExt,
    misc::{serialize_bits, serialize_opt_bits, RawFlags},
};

/// Kind of a row operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub enum RowsEventKind {
    Write,
    Update,
    Delete,
}

/// Layout of a rows event, as selected by its event type code.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct RowsEventSpec {
    /// Event type code (used for error reporting).
    pub event_type: u8,
    pub kind: RowsEventKind,
    /// Rows event version: `0` (pre-GA), `1` or `2`.
    pub version: u8,
    /// Length of the table id on the wire (4 or 6 bytes).
    pub table_id_len: usize,
    /// Whether the event carries a second columns bitmap for after images.
    pub has_after_bitmap: bool,
}

/// A single decoded row.
///
/// Write events only have an after image, delete events only have a before image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinlogRow {
    pub before: Option<Vec<BinlogValue>>,
    pub after: Option<Vec<BinlogValue>>,
}

/// Write, update or delete rows event of any version.
///
/// Rows are decoded using the table map event the event refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowsEvent {
    pub kind: RowsEventKind,
    pub version: u8,
    /// Table identifier.
    ///
    /// Refers to a table defined by a preceding `TABLE_MAP_EVENT`.
    pub table_id: u64,
    /// Raw rows event flags (see [`RowsEventFlags`]).
    pub flags: RawFlags<RowsEventFlags>,
    /// Raw extra data (version 2 only).
    pub extra_data: Vec<u8>,
    /// Number of columns.
    pub num_columns: u64,
    /// Columns present in the (before) image.
    #[serde(serialize_with = "serialize_bits")]
    pub columns_bitmap: BitVec<u8, Lsb0>,
    /// Columns present in the after image of an update event, if it has its own bitmap.
    #[serde(serialize_with = "serialize_opt_bits")]
    pub columns_after_bitmap: Option<BitVec<u8, Lsb0>>,
    pub rows: Vec<BinlogRow>,
    /// Table map event of the referenced table.
    #[serde(skip)]
    pub table: Arc<TableMapEvent>,
}

impl RowsEvent {
    /// Decodes a rows event body (checksum already stripped).
    ///
    /// The referenced table is looked up in `tables`.
    pub fn read(
        spec: RowsEventSpec,
        tables: &HashMap<u64, Arc<TableMapEvent>>,
        data: &[u8],
    ) -> Result<Self, BinlogError> {
        let truncated_body = |err: io::Error| BinlogError::from_body_io(err, spec.event_type, data.len());
        let mut input = data;

        let table_id = input
            .read_uint::<LittleEndian>(spec.table_id_len)
            .map_err(truncated_body)?;
        let table = tables
            .get(&table_id)
            .cloned()
            .ok_or(BinlogError::UnknownTable(table_id))?;

        let flags = input.read_u16::<LittleEndian>().map_err(truncated_body)?;

        let extra_data = if spec.version == 2 {
            // length includes the length field itself
            let extra_data_len = input.read_u16::<LittleEndian>().map_err(truncated_body)? as usize;
            input
                .read_bytes(extra_data_len.saturating_sub(2))
                .map_err(truncated_body)?
        } else {
            Vec::new()
        };

        let num_columns = input.read_lenenc_int().map_err(truncated_body)?;
        if num_columns != table.get_columns_count() as u64 {
            return Err(BinlogError::ColumnCountMismatch {
                table_id,
                expected: table.get_columns_count() as u64,
                actual: num_columns,
            });
        }

        let columns_bitmap = read_bitmap(num_columns as usize, &mut input).map_err(truncated_body)?;
        let columns_after_bitmap = if spec.has_after_bitmap {
            Some(read_bitmap(num_columns as usize, &mut input).map_err(truncated_body)?)
        } else {
            None
        };

        let after_bitmap = columns_after_bitmap.as_ref().unwrap_or(&columns_bitmap);

        let mut rows = Vec::new();
        while !input.is_empty() {
            let remaining = input.len();

            let row = match spec.kind {
                RowsEventKind::Write => BinlogRow {
                    before: None,
                    after: Some(read_image(&table, &columns_bitmap, &mut input)?),
                },
                RowsEventKind::Delete => BinlogRow {
                    before: Some(read_image(&table, &columns_bitmap, &mut input)?),
                    after: None,
                },
                RowsEventKind::Update => {
                    let before = read_image(&table, &columns_bitmap, &mut input)?;
                    if input.is_empty() {
                        return Err(BinlogError::TruncatedRow { table_id });
                    }
                    let after = read_image(&table, after_bitmap, &mut input)?;
                    BinlogRow {
                        before: Some(before),
                        after: Some(after),
                    }
                }
            };

            // an image without columns consumes nothing, so the rest can't be rows
            if input.len() == remaining {
                return Err(BinlogError::TruncatedRow { table_id });
            }

            rows.push(row);
        }

        Ok(Self {
            kind: spec.kind,
            version: spec.version,
            table_id,
            flags: RawFlags(flags),
            extra_data,
            num_columns,
            columns_bitmap,
            columns_after_bitmap,
            rows,
            table,
        })
    }

    /// Returns parsed flags of this event. Unknown bits will be dropped.
    pub fn get_flags(&self) -> RowsEventFlags {
        self.flags.get()
    }

    /// Returns the table map event of the referenced table.
    pub fn table(&self) -> &TableMapEvent {
        &self.table
    }
}

/// Reads a columns bitmap of `ceil(num_columns / 8)` bytes.
fn read_bitmap(num_columns: usize, input: &mut &[u8]) -> io::Result<BitVec<u8, Lsb0>> {
    let bitmap_len = (num_columns + 7) / 8;
    let mut bitmap = BitVec::<u8, Lsb0>::from_vec(input.read_bytes(bitmap_len)?);
    bitmap.truncate(num_columns);
    Ok(bitmap)
}

/// Reads a row image.
///
/// Each image starts with a null bitmap that covers only the columns present in the image.
fn read_image(
    table: &TableMapEvent,
    columns: &BitVec<u8, Lsb0>,
    input: &mut &[u8],
) -> Result<Vec<BinlogValue>, BinlogError> {
    let table_id = table.table_id;
    let truncated_row = |err: BinlogError| match err {
        BinlogError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            BinlogError::TruncatedRow { table_id }
        }
        other => other,
    };

    let num_present = columns.count_ones();
    let null_bitmap = read_bitmap(num_present, input)
        .map_err(BinlogError::from)
        .map_err(truncated_row)?;

    let mut values = Vec::with_capacity(num_present);
    for (image_idx, col_idx) in columns.iter_ones().enumerate() {
        if null_bitmap[image_idx] {
            values.push(BinlogValue::Null);
            continue;
        }

        let column_type = table.columns_type.0[col_idx];
        let meta = table.get_column_metadata(col_idx).unwrap_or(0);
        let value = read_value(column_type, meta, table.is_unsigned(col_idx), &mut *input)
            .map_err(truncated_row)?;
        values.push(value);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::{
        consts::ColumnType,
        test_util::{rows_body, table_map_body},
    };

    use ColumnType::*;

    fn spec(kind: RowsEventKind, version: u8, has_after_bitmap: bool) -> RowsEventSpec {
        RowsEventSpec {
            event_type: 0,
            kind,
            version,
            table_id_len: 6,
            has_after_bitmap,
        }
    }

    /// Table 7 with columns `(INT, VARCHAR(20) NULL)`.
    fn tables() -> HashMap<u64, Arc<TableMapEvent>> {
        let body = table_map_body(
            7,
            6,
            "db",
            "t",
            &[(MYSQL_TYPE_LONG, &[]), (MYSQL_TYPE_VARCHAR, &[20, 0])],
            &[0b10],
            &[],
        );
        let table = TableMapEvent::read(6, body.len(), &body[..]).unwrap();
        let mut tables = HashMap::new();
        tables.insert(7, Arc::new(table));
        tables
    }

    fn row(id: i32, name: Option<&str>) -> Vec<u8> {
        let mut data = Vec::new();
        match name {
            Some(name) => {
                data.push(0b00);
                data.extend_from_slice(&id.to_le_bytes());
                data.push(name.len() as u8);
                data.extend_from_slice(name.as_bytes());
            }
            None => {
                data.push(0b10);
                data.extend_from_slice(&id.to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn should_read_write_rows() {
        let mut rows = row(1, Some("a"));
        rows.extend(row(2, None));
        let body = rows_body(7, 6, 2, 2, &[0b11], None, &rows);

        let event = RowsEvent::read(spec(RowsEventKind::Write, 2, false), &tables(), &body).unwrap();
        assert_eq!(event.table_id, 7);
        assert_eq!(event.table().table_name.get(), "t");
        assert!(event.get_flags().contains(RowsEventFlags::STMT_END));
        assert_eq!(event.columns_bitmap.len(), 2);
        assert!(event.columns_after_bitmap.is_none());
        assert_eq!(
            event.rows,
            vec![
                BinlogRow {
                    before: None,
                    after: Some(vec![BinlogValue::Int(1), "a".into()]),
                },
                BinlogRow {
                    before: None,
                    after: Some(vec![BinlogValue::Int(2), BinlogValue::Null]),
                },
            ]
        );
    }

    #[test]
    fn should_read_delete_rows_with_partial_image() {
        // only the first column is present
        let mut rows = vec![0b0];
        rows.extend_from_slice(&5_i32.to_le_bytes());
        let body = rows_body(7, 6, 1, 2, &[0b01], None, &rows);

        let event =
            RowsEvent::read(spec(RowsEventKind::Delete, 1, false), &tables(), &body).unwrap();
        assert_eq!(
            event.rows,
            vec![BinlogRow {
                before: Some(vec![BinlogValue::Int(5)]),
                after: None,
            }]
        );
    }

    #[test]
    fn should_read_update_rows_with_two_bitmaps() {
        let mut rows = row(1, Some("a"));
        // after image has only the second column
        rows.extend_from_slice(&[0b0, 1, b'b']);
        let body = rows_body(7, 6, 2, 2, &[0b11], Some(&[0b10]), &rows);

        let event =
            RowsEvent::read(spec(RowsEventKind::Update, 2, true), &tables(), &body).unwrap();
        assert_eq!(event.columns_bitmap.len(), 2);
        assert_eq!(event.columns_after_bitmap.as_ref().map(|x| x.len()), Some(2));
        assert_eq!(
            event.rows,
            vec![BinlogRow {
                before: Some(vec![BinlogValue::Int(1), "a".into()]),
                after: Some(vec!["b".into()]),
            }]
        );
    }

    #[test]
    fn should_read_v0_update_rows_with_single_bitmap() {
        let mut rows = row(1, Some("a"));
        rows.extend(row(1, Some("b")));
        let body = rows_body(7, 6, 0, 2, &[0b11], None, &rows);

        let event =
            RowsEvent::read(spec(RowsEventKind::Update, 0, false), &tables(), &body).unwrap();
        assert!(event.extra_data.is_empty());
        assert!(event.columns_after_bitmap.is_none());
        assert_eq!(
            event.rows[0].after,
            Some(vec![BinlogValue::Int(1), "b".into()])
        );
    }

    #[test]
    fn should_fail_on_truncated_row() {
        let mut rows = row(1, Some("abc"));
        rows.pop();
        let body = rows_body(7, 6, 2, 2, &[0b11], None, &rows);

        let err = RowsEvent::read(spec(RowsEventKind::Write, 2, false), &tables(), &body)
            .unwrap_err();
        assert!(matches!(err, BinlogError::TruncatedRow { table_id: 7 }));

        // update without after image
        let body = rows_body(7, 6, 2, 2, &[0b11], Some(&[0b11]), &row(1, Some("a")));
        let err =
            RowsEvent::read(spec(RowsEventKind::Update, 2, true), &tables(), &body).unwrap_err();
        assert!(matches!(err, BinlogError::TruncatedRow { table_id: 7 }));
    }

    #[test]
    fn should_check_table_and_column_count() {
        let body = rows_body(8, 6, 2, 2, &[0b11], None, &row(1, None));
        let err = RowsEvent::read(spec(RowsEventKind::Write, 2, false), &tables(), &body)
            .unwrap_err();
        assert!(matches!(err, BinlogError::UnknownTable(8)));

        let body = rows_body(7, 6, 2, 3, &[0b111], None, &[]);
        let err = RowsEvent::read(spec(RowsEventKind::Write, 2, false), &tables(), &body)
            .unwrap_err();
        assert!(matches!(
            err,
            BinlogError::ColumnCountMismatch {
                table_id: 7,
                expected: 2,
                actual: 3
            }
        ));

        let err = RowsEvent::read(spec(RowsEventKind::Write, 2, false), &tables(), &body[..7])
            .unwrap_err();
        assert!(matches!(err, BinlogError::TruncatedBody { .. }));
    }

    #[test]
    fn should_reject_images_without_columns() {
        let body = rows_body(7, 6, 2, 2, &[0b00], None, &[0x00]);
        let err = RowsEvent::read(spec(RowsEventKind::Write, 2, false), &tables(), &body)
            .unwrap_err();
        assert!(matches!(err, BinlogError::TruncatedRow { table_id: 7 }));
    }
}
