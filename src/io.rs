// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use byteorder::{LittleEndian as LE, ReadBytesExt};

use std::io::{self, Read};

pub trait ReadMysqlExt: ReadBytesExt {
    /// Reads a length-encoded integer.
    fn read_lenenc_int(&mut self) -> io::Result<u64> {
        match self.read_u8()? {
            0xfc => self.read_uint::<LE>(2),
            0xfd => self.read_uint::<LE>(3),
            0xfe => self.read_uint::<LE>(8),
            0xff => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid length-encoded integer value",
            )),
            x => Ok(x as u64),
        }
    }

    /// Reads exactly `len` bytes into a new vector.
    ///
    /// `len` may come from the stream, so the buffer only grows as bytes arrive.
    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        Read::take(&mut *self, len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(buf)
    }

    /// Reads a one byte length followed by that many bytes.
    fn read_u8_prefixed_bytes(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }
}

impl<T> ReadMysqlExt for T where T: ReadBytesExt {}

/// Reads into `buf` until it is full or the stream ends.
///
/// Returns the number of bytes read, which is less than `buf.len()` only at the end of the
/// stream.
pub(crate) fn read_full<T: Read>(mut input: T, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
