// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use byteorder::{BigEndian as BE, LittleEndian as LE, ReadBytesExt};
use serde::Serialize;

use std::{
    convert::TryFrom,
    io::{self, Read},
};

use super::{
    consts::ColumnType,
    decimal::read_decimal,
    error::BinlogError,
    time::{my_packed_time_make, MysqlTime},
};
use crate::io::ReadMysqlExt;

/// Value of a column of a binlog row image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BinlogValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
}

impl BinlogValue {
    /// Text if bytes are valid utf-8, bytes otherwise.
    fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => BinlogValue::Text(text),
            Err(err) => BinlogValue::Bytes(err.into_bytes()),
        }
    }

    /// Returns `true` if this is a `Null` value.
    pub fn is_null(&self) -> bool {
        matches!(self, BinlogValue::Null)
    }
}

impl From<&str> for BinlogValue {
    fn from(x: &str) -> Self {
        BinlogValue::Text(x.into())
    }
}

impl From<i64> for BinlogValue {
    fn from(x: i64) -> Self {
        BinlogValue::Int(x)
    }
}

/// Reads a non-null value of a column of the given type.
///
/// `meta` is the column metadata as returned by `TableMapEvent::get_column_metadata`.
pub fn read_value<T: Read>(
    column_type: u8,
    meta: u16,
    is_unsigned: bool,
    mut input: T,
) -> Result<BinlogValue, BinlogError> {
    use ColumnType::*;

    let column_type = ColumnType::try_from(column_type)
        .map_err(|err| BinlogError::UnsupportedColumnType(err.0))?;

    let value = match column_type {
        MYSQL_TYPE_NULL => BinlogValue::Null,
        MYSQL_TYPE_TINY if is_unsigned => BinlogValue::UInt(input.read_u8()?.into()),
        MYSQL_TYPE_TINY => BinlogValue::Int(input.read_i8()?.into()),
        MYSQL_TYPE_SHORT if is_unsigned => BinlogValue::UInt(input.read_u16::<LE>()?.into()),
        MYSQL_TYPE_SHORT => BinlogValue::Int(input.read_i16::<LE>()?.into()),
        MYSQL_TYPE_INT24 if is_unsigned => BinlogValue::UInt(input.read_u24::<LE>()?.into()),
        MYSQL_TYPE_INT24 => BinlogValue::Int(input.read_i24::<LE>()?.into()),
        MYSQL_TYPE_LONG if is_unsigned => BinlogValue::UInt(input.read_u32::<LE>()?.into()),
        MYSQL_TYPE_LONG => BinlogValue::Int(input.read_i32::<LE>()?.into()),
        MYSQL_TYPE_LONGLONG if is_unsigned => BinlogValue::UInt(input.read_u64::<LE>()?),
        MYSQL_TYPE_LONGLONG => BinlogValue::Int(input.read_i64::<LE>()?),
        MYSQL_TYPE_FLOAT => BinlogValue::Float(input.read_f32::<LE>()?.into()),
        MYSQL_TYPE_DOUBLE => BinlogValue::Float(input.read_f64::<LE>()?),
        MYSQL_TYPE_YEAR => match input.read_u8()? {
            0 => BinlogValue::Int(0),
            x => BinlogValue::Int(1900 + i64::from(x)),
        },
        MYSQL_TYPE_NEWDECIMAL => {
            let precision = (meta >> 8) as usize;
            let scale = (meta & 0xff) as usize;
            BinlogValue::Text(read_decimal(precision, scale, &mut input)?)
        }
        MYSQL_TYPE_DATE | MYSQL_TYPE_NEWDATE => {
            let x = input.read_u24::<LE>()?;
            let date = MysqlTime::date(x >> 9, (x >> 5) & 15, x & 31);
            BinlogValue::Text(date.to_string())
        }
        MYSQL_TYPE_TIME => {
            // signed HHMMSS
            let x = input.read_i24::<LE>()?;
            let abs = x.unsigned_abs();
            let time = MysqlTime::time(x < 0, abs / 10000, (abs % 10000) / 100, abs % 100);
            BinlogValue::Text(time.to_string())
        }
        MYSQL_TYPE_DATETIME => {
            let x = input.read_u64::<LE>()?;
            let (date, time) = (x / 1_000_000, x % 1_000_000);
            let datetime = MysqlTime::datetime(
                (date / 10000) as u32,
                ((date % 10000) / 100) as u32,
                (date % 100) as u32,
                (time / 10000) as u32,
                ((time % 10000) / 100) as u32,
                (time % 100) as u32,
            );
            BinlogValue::Text(datetime.to_string())
        }
        MYSQL_TYPE_TIMESTAMP => BinlogValue::Int(input.read_u32::<LE>()?.into()),
        MYSQL_TYPE_TIMESTAMP2 => {
            let dec = usize::from(meta as u8);
            let seconds = input.read_u32::<BE>()?;
            let usec = read_timestamp_frac(dec, &mut input)?;
            if dec > 0 {
                BinlogValue::Text(format!(
                    "{}.{:0width$}",
                    seconds,
                    usec / 10_u32.pow(6 - dec.min(6) as u32),
                    width = dec.min(6)
                ))
            } else {
                BinlogValue::Text(seconds.to_string())
            }
        }
        MYSQL_TYPE_DATETIME2 => {
            let dec = usize::from(meta as u8);
            let packed = read_datetime2_packed(dec, &mut input)?;
            let datetime = MysqlTime::from_int64_datetime_packed(packed);
            BinlogValue::Text(format!("{:.*}", dec, datetime))
        }
        MYSQL_TYPE_TIME2 => {
            let dec = usize::from(meta as u8);
            let packed = read_time2_packed(dec, &mut input)?;
            let time = MysqlTime::from_int64_time_packed(packed);
            BinlogValue::Text(format!("{:.*}", dec, time))
        }
        MYSQL_TYPE_VARCHAR | MYSQL_TYPE_VAR_STRING => {
            BinlogValue::from_bytes(read_string(usize::from(meta), &mut input)?)
        }
        MYSQL_TYPE_STRING | MYSQL_TYPE_ENUM | MYSQL_TYPE_SET => {
            let (real_type, len) = string_real_type(meta);
            match ColumnType::try_from(real_type) {
                Ok(MYSQL_TYPE_ENUM) => match len {
                    1 => BinlogValue::Int(input.read_u8()?.into()),
                    2 => BinlogValue::Int(input.read_u16::<LE>()?.into()),
                    _ => return Err(BinlogError::UnsupportedColumnType(real_type)),
                },
                Ok(MYSQL_TYPE_SET) => match len {
                    1..=8 => BinlogValue::UInt(input.read_uint::<LE>(len)?),
                    _ => return Err(BinlogError::UnsupportedColumnType(real_type)),
                },
                _ => BinlogValue::from_bytes(read_string(len, &mut input)?),
            }
        }
        MYSQL_TYPE_BIT => {
            let nbits = usize::from(meta >> 8) * 8 + usize::from(meta & 0xff);
            let nbytes = (nbits + 7) / 8;
            match nbytes {
                0 => BinlogValue::UInt(0),
                1..=8 => {
                    let x = input.read_uint::<BE>(nbytes)?;
                    if nbits == 1 {
                        BinlogValue::Bool(x != 0)
                    } else {
                        BinlogValue::UInt(x)
                    }
                }
                _ => return Err(BinlogError::UnsupportedColumnType(column_type as u8)),
            }
        }
        MYSQL_TYPE_TINY_BLOB
        | MYSQL_TYPE_MEDIUM_BLOB
        | MYSQL_TYPE_LONG_BLOB
        | MYSQL_TYPE_BLOB
        | MYSQL_TYPE_JSON
        | MYSQL_TYPE_GEOMETRY => {
            let len_bytes = usize::from(meta);
            if !(1..=4).contains(&len_bytes) {
                return Err(BinlogError::UnsupportedColumnType(column_type as u8));
            }
            let len = input.read_uint::<LE>(len_bytes)?;
            BinlogValue::Bytes(read_blob(len, &mut input)?)
        }
        MYSQL_TYPE_DECIMAL | MYSQL_TYPE_TYPED_ARRAY => {
            return Err(BinlogError::UnsupportedColumnType(column_type as u8))
        }
    };

    Ok(value)
}

/// Returns real type and maximum length of a `STRING` column.
///
/// Length of a long `CHAR` column doesn't fit into a byte, so its two high bits are stored
/// inverted in the real type byte.
pub fn string_real_type(meta: u16) -> (u8, usize) {
    let byte0 = (meta >> 8) as u8;
    let byte1 = (meta & 0xff) as usize;

    if byte0 & 0x30 != 0x30 {
        let len = byte1 | (usize::from((byte0 & 0x30) ^ 0x30) << 4);
        (byte0 | 0x30, len)
    } else {
        (byte0, byte1)
    }
}

/// Reads a string prefixed with its length (one byte if `max_len < 256`, two otherwise).
fn read_string<T: Read>(max_len: usize, mut input: T) -> io::Result<Vec<u8>> {
    let len = if max_len < 256 {
        usize::from(input.read_u8()?)
    } else {
        usize::from(input.read_u16::<LE>()?)
    };
    input.read_bytes(len)
}

/// Reads `len` bytes without trusting `len` for the allocation size.
fn read_blob<T: Read>(len: u64, input: T) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    input.take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "blob is longer than the row image",
        ));
    }
    Ok(buf)
}

/// Reads fractional part of `TIMESTAMP2` as microseconds.
fn read_timestamp_frac<T: Read>(dec: usize, mut input: T) -> io::Result<u32> {
    Ok(match dec {
        1 | 2 => u32::from(input.read_u8()?) * 10_000,
        3 | 4 => u32::from(input.read_u16::<BE>()?) * 100,
        5 | 6 => input.read_u24::<BE>()?,
        _ => 0,
    })
}

/// Reads `DATETIME2` as a packed datetime.
fn read_datetime2_packed<T: Read>(dec: usize, mut input: T) -> io::Result<i64> {
    const DATETIMEF_INT_OFS: i64 = 0x80_0000_0000;

    let intpart = input.read_uint::<BE>(5)? as i64 - DATETIMEF_INT_OFS;
    let frac = match dec {
        1 | 2 => i64::from(input.read_i8()?) * 10_000,
        3 | 4 => i64::from(input.read_i16::<BE>()?) * 100,
        5 | 6 => i64::from(input.read_i24::<BE>()?),
        _ => 0,
    };

    Ok(my_packed_time_make(intpart, frac))
}

/// Reads `TIME2` as a packed time.
fn read_time2_packed<T: Read>(dec: usize, mut input: T) -> io::Result<i64> {
    const TIMEF_INT_OFS: i64 = 0x80_0000;
    const TIMEF_OFS: i64 = 0x8000_0000_0000;

    match dec {
        1 | 2 => {
            let mut intpart = input.read_uint::<BE>(3)? as i64 - TIMEF_INT_OFS;
            let mut frac = i64::from(input.read_u8()?);
            if intpart < 0 && frac != 0 {
                // negative values are stored with reverse fractional part order
                intpart += 1;
                frac -= 0x100;
            }
            Ok(my_packed_time_make(intpart, frac * 10_000))
        }
        3 | 4 => {
            let mut intpart = input.read_uint::<BE>(3)? as i64 - TIMEF_INT_OFS;
            let mut frac = i64::from(input.read_u16::<BE>()?);
            if intpart < 0 && frac != 0 {
                intpart += 1;
                frac -= 0x10000;
            }
            Ok(my_packed_time_make(intpart, frac * 100))
        }
        5 | 6 => Ok(input.read_uint::<BE>(6)? as i64 - TIMEF_OFS),
        _ => {
            let intpart = input.read_uint::<BE>(3)? as i64 - TIMEF_INT_OFS;
            Ok(my_packed_time_make(intpart, 0))
        }
    }
}
