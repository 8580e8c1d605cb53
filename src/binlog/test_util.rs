// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Builders of synthetic binlog bytes.

use byteorder::{LittleEndian as LE, WriteBytesExt};

use super::consts::{BinlogChecksumAlg, ColumnType, EventType, BINLOG_MAGIC, EVENT_HEADER_LEN};

/// Writes a length-encoded integer.
fn push_lenenc_int(out: &mut Vec<u8>, x: u64) {
    match x {
        0..=250 => out.push(x as u8),
        251..=0xffff => {
            out.push(0xfc);
            out.write_u16::<LE>(x as u16).unwrap();
        }
        0x1_0000..=0xff_ffff => {
            out.push(0xfd);
            out.write_u24::<LE>(x as u32).unwrap();
        }
        _ => {
            out.push(0xfe);
            out.write_u64::<LE>(x).unwrap();
        }
    }
}

/// Event header with the given fields and `log_pos = 0`.
pub fn event_header(
    event_type: u8,
    timestamp: u32,
    server_id: u32,
    event_size: u32,
    flags: u16,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(EVENT_HEADER_LEN);
    out.write_u32::<LE>(timestamp).unwrap();
    out.push(event_type);
    out.write_u32::<LE>(server_id).unwrap();
    out.write_u32::<LE>(event_size).unwrap();
    out.write_u32::<LE>(0).unwrap();
    out.write_u16::<LE>(flags).unwrap();
    out
}

/// Post-header lengths table for event types `1..=0x27`.
///
/// `table_map` is used for `TABLE_MAP_EVENT`, `rows` for every rows event type.
pub fn header_lengths(table_map: u8, rows: u8) -> Vec<u8> {
    use EventType::*;

    let mut lengths = vec![0_u8; 0x27];
    let mut set = |ty: EventType, len: u8| lengths[ty as usize - 1] = len;

    set(START_EVENT_V3, 56);
    set(QUERY_EVENT, 13);
    set(ROTATE_EVENT, 8);
    set(LOAD_EVENT, 18);
    set(CREATE_FILE_EVENT, 4);
    set(APPEND_BLOCK_EVENT, 4);
    set(EXEC_LOAD_EVENT, 4);
    set(DELETE_FILE_EVENT, 4);
    set(NEW_LOAD_EVENT, 18);
    set(FORMAT_DESCRIPTION_EVENT, 84);
    set(BEGIN_LOAD_QUERY_EVENT, 4);
    set(EXECUTE_LOAD_QUERY_EVENT, 26);
    set(TABLE_MAP_EVENT, table_map);
    for ty in [
        PRE_GA_WRITE_ROWS_EVENT,
        PRE_GA_UPDATE_ROWS_EVENT,
        PRE_GA_DELETE_ROWS_EVENT,
        WRITE_ROWS_EVENT_V1,
        UPDATE_ROWS_EVENT_V1,
        DELETE_ROWS_EVENT_V1,
        WRITE_ROWS_EVENT,
        UPDATE_ROWS_EVENT,
        DELETE_ROWS_EVENT,
    ]
    .iter()
    {
        set(*ty, rows);
    }
    set(INCIDENT_EVENT, 2);
    set(GTID_EVENT, 42);
    set(ANONYMOUS_GTID_EVENT, 42);

    lengths
}

/// Format description event body.
///
/// If `alg` is given, the checksum algorithm byte and a (zeroed) checksum are appended.
pub fn fde_body(server_version: &str, header_lengths: &[u8], alg: Option<BinlogChecksumAlg>) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<LE>(4).unwrap();
    let mut version = [0_u8; 50];
    version[..server_version.len()].copy_from_slice(server_version.as_bytes());
    out.extend_from_slice(&version);
    out.write_u32::<LE>(0).unwrap();
    out.push(EVENT_HEADER_LEN as u8);
    out.extend_from_slice(header_lengths);
    if let Some(alg) = alg {
        out.push(alg as u8);
        out.write_u32::<LE>(0).unwrap();
    }
    out
}

/// Query event body with zero execution time and error code.
pub fn query_body(thread_id: u32, schema: &str, status_vars: &[u8], query: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32::<LE>(thread_id).unwrap();
    out.write_u32::<LE>(0).unwrap();
    out.push(schema.len() as u8);
    out.write_u16::<LE>(0).unwrap();
    out.write_u16::<LE>(status_vars.len() as u16).unwrap();
    out.extend_from_slice(status_vars);
    out.extend_from_slice(schema.as_bytes());
    out.push(0);
    out.extend_from_slice(query.as_bytes());
    out
}

/// Table map event body. Each column is given as its type and raw metadata bytes.
pub fn table_map_body(
    table_id: u64,
    id_len: usize,
    schema: &str,
    table: &str,
    columns: &[(ColumnType, &[u8])],
    null_bitmap: &[u8],
    optional: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_uint::<LE>(table_id, id_len).unwrap();
    out.write_u16::<LE>(0).unwrap();
    out.push(schema.len() as u8);
    out.extend_from_slice(schema.as_bytes());
    out.push(0);
    out.push(table.len() as u8);
    out.extend_from_slice(table.as_bytes());
    out.push(0);

    push_lenenc_int(&mut out, columns.len() as u64);
    out.extend(columns.iter().map(|(ty, _)| *ty as u8));

    let metadata = columns
        .iter()
        .flat_map(|(_, meta)| meta.iter().copied())
        .collect::<Vec<_>>();
    push_lenenc_int(&mut out, metadata.len() as u64);
    out.extend_from_slice(&metadata);

    out.extend_from_slice(null_bitmap);
    out.extend_from_slice(optional);
    out
}

/// Rows event body with `STMT_END` flag and no extra data.
///
/// `bitmap2` is the after image bitmap of update events, `rows` is raw row images.
pub fn rows_body(
    table_id: u64,
    id_len: usize,
    version: u8,
    num_columns: u64,
    bitmap1: &[u8],
    bitmap2: Option<&[u8]>,
    rows: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_uint::<LE>(table_id, id_len).unwrap();
    out.write_u16::<LE>(0x0001).unwrap();
    if version == 2 {
        out.write_u16::<LE>(2).unwrap();
    }
    push_lenenc_int(&mut out, num_columns);
    out.extend_from_slice(bitmap1);
    if let Some(bitmap2) = bitmap2 {
        out.extend_from_slice(bitmap2);
    }
    out.extend_from_slice(rows);
    out
}

/// Xid event body.
pub fn xid_body(xid: u64) -> Vec<u8> {
    xid.to_le_bytes().to_vec()
}

/// Complete event: header, body and a CRC32 trailer if `checksum` is `true`.
pub fn event(event_type: EventType, body: &[u8], checksum: bool) -> Vec<u8> {
    let trailer_len = if checksum { 4 } else { 0 };
    let event_size = EVENT_HEADER_LEN + body.len() + trailer_len;

    let mut out = event_header(event_type as u8, 1_600_000_000, 1, event_size as u32, 0);
    out.extend_from_slice(body);
    if checksum {
        let crc = crc32fast::hash(&out);
        out.write_u32::<LE>(crc).unwrap();
    }
    out
}

/// Binlog file contents: the magic followed by the given events.
pub fn stream(events: &[Vec<u8>]) -> Vec<u8> {
    let mut out = BINLOG_MAGIC.to_vec();
    for event in events {
        out.extend_from_slice(event);
    }
    out
}
