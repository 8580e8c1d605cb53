// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use bitvec::{
    order::{Lsb0, Msb0},
    vec::BitVec,
};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use saturating::Saturating as S;
use serde::Serialize;

use std::{
    convert::TryFrom,
    io::{self, Read},
};

use crate::{
    binlog::consts::{ColumnType, UnknownColumnType},
    io::ReadMysqlExt,
    misc::{serialize_bits, serialize_opt_bits, LimitRead, RawSeq, RawText},
};

/// Type of an optional metadata field of a table map event.
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum OptionalMetadataFieldType {
    /// UNSIGNED flag of numeric columns.
    ///
    /// # Value format
    ///
    /// For each numeric column, a bit indicates whether the numeric colunm has unsigned flag.
    /// `1` means it is unsigned. The number of bytes needed for this is
    /// `int((column_count + 7) / 8)`. The order is the same as the order of `column_type` field.
    SIGNEDNESS = 1,
}

/// Table map event.
///
/// In row-based mode, every row operation event is preceded by a table map event which maps
/// a table definition to a number.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct TableMapEvent {
    // post-header
    /// The number that identifies the table.
    pub table_id: u64,
    /// Reserved for future use; currently always 0.
    pub flags: u16,

    // payload
    /// The name of the database in which the table resides.
    pub database_name: RawText,
    /// The name of the table.
    pub table_name: RawText,
    /// The type of each column in the table, listed from left to right.
    pub columns_type: RawSeq<u8, UnknownColumnType, ColumnType>,
    /// Type-specific metadata of each column from left to right.
    ///
    /// See [`TableMapEvent::get_column_metadata`] for the meaning of a value.
    pub columns_metadata: Vec<u16>,
    /// For each column, a bit indicating whether data in the column can be NULL or not.
    ///
    /// The flag for the first column from the left is in the least-significant bit
    /// of the first byte, the second is in the second least significant bit of the first byte,
    /// the ninth is in the least significant bit of the second byte, and so on.
    #[serde(serialize_with = "serialize_bits")]
    pub null_bitmask: BitVec<u8, Lsb0>,
    /// Raw optional metadata.
    pub optional_metadata: Vec<u8>,
    /// Value of the `SIGNEDNESS` optional metadata field, if any.
    ///
    /// One bit per numeric column, most significant bit first.
    #[serde(serialize_with = "serialize_opt_bits")]
    pub signedness: Option<BitVec<u8, Msb0>>,
    /// Unsigned flag of every column, derived from `signedness`.
    #[serde(skip)]
    unsigned_columns: BitVec<u8, Lsb0>,
}

impl TableMapEvent {
    /// Reads a table map event with table ids of the given length (4 or 6 bytes).
    pub fn read<T: Read>(table_id_len: usize, data_len: usize, mut input: T) -> io::Result<Self> {
        let mut input = input.limit(S(data_len));

        let table_id = input.read_uint::<LittleEndian>(table_id_len)?;
        let flags = input.read_u16::<LittleEndian>()?;

        let database_name = input.read_u8_prefixed_bytes()?;
        input.read_u8()?; // skip null

        let table_name = input.read_u8_prefixed_bytes()?;
        input.read_u8()?; // skip null

        let columns_count = input.read_lenenc_int()? as usize;
        if columns_count > input.get_limit() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "columns count exceeds event length",
            ));
        }
        let columns_type = input.read_bytes(columns_count)?;

        let metadata_len = input.read_lenenc_int()? as usize;
        if metadata_len > input.get_limit() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "metadata length exceeds event length",
            ));
        }
        let metadata = input.read_bytes(metadata_len)?;
        let columns_metadata = read_columns_metadata(&columns_type, &metadata)?;

        let bitmask_len = (columns_count + 7) / 8;
        let mut null_bitmask = BitVec::<u8, Lsb0>::from_vec(input.read_bytes(bitmask_len)?);
        null_bitmask.truncate(columns_count);

        let optional_metadata_len = input.get_limit();
        let optional_metadata = input.read_bytes(optional_metadata_len)?;

        let mut this = Self {
            table_id,
            flags,
            database_name: RawText(database_name),
            table_name: RawText(table_name),
            columns_type: RawSeq::new(columns_type),
            columns_metadata,
            null_bitmask,
            optional_metadata,
            signedness: None,
            unsigned_columns: BitVec::new(),
        };

        this.signedness = this.read_signedness();
        this.unsigned_columns = this.compute_unsigned_columns();

        Ok(this)
    }

    /// Returns columns count in this event.
    pub fn get_columns_count(&self) -> usize {
        self.columns_type.len()
    }

    /// Returns type of the given column, or raw type code if it is unknown.
    pub fn get_column_type(&self, col_idx: usize) -> Option<Result<ColumnType, UnknownColumnType>> {
        self.columns_type.get(col_idx)
    }

    /// Returns metadata of the given column.
    ///
    /// *   `FLOAT`, `DOUBLE`, blobs, `JSON`, `GEOMETRY` – pack length/size,
    /// *   `TIME2`, `DATETIME2`, `TIMESTAMP2` – fractional seconds precision,
    /// *   `VARCHAR`, `VAR_STRING` – maximum length,
    /// *   `BIT` – `bytes << 8 | bits`,
    /// *   `NEWDECIMAL` – `precision << 8 | scale`,
    /// *   `STRING`, `ENUM`, `SET` – `real_type << 8 | length`,
    /// *   `0` for other types.
    pub fn get_column_metadata(&self, col_idx: usize) -> Option<u16> {
        self.columns_metadata.get(col_idx).copied()
    }

    /// Returns `true` if the given column is nullable.
    pub fn is_nullable(&self, col_idx: usize) -> bool {
        self.null_bitmask
            .get(col_idx)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Returns `true` if the given column is known to be an unsigned numeric column.
    pub fn is_unsigned(&self, col_idx: usize) -> bool {
        self.unsigned_columns
            .get(col_idx)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Returns the `SIGNEDNESS` field of the optional metadata, if it is present and well-formed.
    fn read_signedness(&self) -> Option<BitVec<u8, Msb0>> {
        let mut data = &self.optional_metadata[..];

        while !data.is_empty() {
            let field_type = data.read_u8().ok()?;
            let len = data.read_lenenc_int().ok()? as usize;
            let value = data.get(..len)?;
            data = &data[len..];

            if field_type == OptionalMetadataFieldType::SIGNEDNESS as u8 {
                let num_numeric = self
                    .columns_type
                    .0
                    .iter()
                    .filter_map(|ty| ColumnType::try_from(*ty).ok())
                    .filter(ColumnType::is_numeric_type)
                    .count();
                let mut flags = BitVec::<u8, Msb0>::from_slice(value);
                if flags.len() < num_numeric {
                    return None;
                }
                flags.truncate(num_numeric);
                return Some(flags);
            }
        }

        None
    }

    fn compute_unsigned_columns(&self) -> BitVec<u8, Lsb0> {
        let mut unsigned = BitVec::repeat(false, self.get_columns_count());
        let signedness = match self.signedness {
            Some(ref signedness) => signedness,
            None => return unsigned,
        };

        let mut numeric_index = 0;
        for (col_idx, ty) in self.columns_type.0.iter().enumerate() {
            let is_numeric = ColumnType::try_from(*ty)
                .map(|ty| ty.is_numeric_type())
                .unwrap_or(false);
            if is_numeric {
                let flag = signedness
                    .get(numeric_index)
                    .map(|bit| *bit)
                    .unwrap_or(false);
                unsigned.set(col_idx, flag);
                numeric_index += 1;
            }
        }

        unsigned
    }
}

/// Splits the metadata block into one value per column.
///
/// Two-byte metadata is little-endian for VARCHAR, VAR_STRING and BIT, big-endian otherwise.
fn read_columns_metadata(columns_type: &[u8], mut metadata: &[u8]) -> io::Result<Vec<u16>> {
    use ColumnType::*;

    let mut columns_metadata = Vec::with_capacity(columns_type.len());

    for ty in columns_type {
        let column_type = match ColumnType::try_from(*ty) {
            Ok(column_type) => column_type,
            Err(_) => {
                columns_metadata.push(0);
                continue;
            }
        };

        let value = match (column_type.get_metadata_len(), column_type) {
            (1, _) => u16::from(metadata.read_u8()?),
            (2, MYSQL_TYPE_VARCHAR) | (2, MYSQL_TYPE_VAR_STRING) | (2, MYSQL_TYPE_BIT) => {
                metadata.read_u16::<LittleEndian>()?
            }
            (2, _) => metadata.read_u16::<BigEndian>()?,
            _ => 0,
        };
        columns_metadata.push(value);
    }

    Ok(columns_metadata)
}
