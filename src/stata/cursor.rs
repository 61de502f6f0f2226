//! An explicit decode position over a byte buffer.
//!
//! Metadata parsing threads a `Cursor` through each step instead of relying
//! on a shared file position, so the same code runs against a memory-mapped
//! file or a plain `Vec<u8>`.

use nom::{
    bytes::complete::{tag, take},
    number::{complete as num, Endianness},
    IResult,
};

use super::error::{DownstreamError, Error, Result};
use super::values::bytes_to_string;
use super::ByteOrder;

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    order: Endianness,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8], order: ByteOrder) -> Cursor<'a> {
        Cursor {
            buf,
            pos: 0,
            order: order.endianness(),
        }
    }

    /// The byte order is usually only known after the first few fields.
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order.endianness();
    }

    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn seek(&mut self, pos: u64, section: &'static str) -> Result<()> {
        if pos > self.len() {
            return Err(Error::malformed(
                section,
                pos,
                format!("offset beyond end of file ({} bytes)", self.len()),
            ));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn advance<O>(&mut self, (rest, out): (&'a [u8], O)) -> O {
        self.pos = self.buf.len() - rest.len();
        out
    }

    pub fn take(&mut self, n: usize, section: &'static str) -> Result<&'a [u8]> {
        let r: IResult<&[u8], &[u8]> = take(n)(self.rest());
        let r = r.map_res(section, self.position())?;
        Ok(self.advance(r))
    }

    pub fn skip(&mut self, n: usize, section: &'static str) -> Result<()> {
        self.take(n, section).map(|_| ())
    }

    /// Fixed width, null terminated text.
    pub fn text(&mut self, n: usize, section: &'static str) -> Result<String> {
        self.take(n, section).map(bytes_to_string)
    }

    pub fn u8(&mut self, section: &'static str) -> Result<u8> {
        let r: IResult<&[u8], u8> = num::u8(self.rest());
        let r = r.map_res(section, self.position())?;
        Ok(self.advance(r))
    }

    pub fn u16(&mut self, section: &'static str) -> Result<u16> {
        let r: IResult<&[u8], u16> = num::u16(self.order)(self.rest());
        let r = r.map_res(section, self.position())?;
        Ok(self.advance(r))
    }

    pub fn u32(&mut self, section: &'static str) -> Result<u32> {
        let r: IResult<&[u8], u32> = num::u32(self.order)(self.rest());
        let r = r.map_res(section, self.position())?;
        Ok(self.advance(r))
    }

    pub fn i32(&mut self, section: &'static str) -> Result<i32> {
        let r: IResult<&[u8], i32> = num::i32(self.order)(self.rest());
        let r = r.map_res(section, self.position())?;
        Ok(self.advance(r))
    }

    pub fn u64(&mut self, section: &'static str) -> Result<u64> {
        let r: IResult<&[u8], u64> = num::u64(self.order)(self.rest());
        let r = r.map_res(section, self.position())?;
        Ok(self.advance(r))
    }

    /// Unsigned integer of 1, 2, 4 or 8 bytes.
    pub fn uint(&mut self, width: usize, section: &'static str) -> Result<u64> {
        match width {
            1 => self.u8(section).map(u64::from),
            2 => self.u16(section).map(u64::from),
            4 => self.u32(section).map(u64::from),
            8 => self.u64(section),
            _ => Err(Error::malformed(
                section,
                self.position(),
                format!("unsupported integer width {width}"),
            )),
        }
    }

    /// Consumes `expected` or fails without moving.
    pub fn tag(&mut self, expected: &[u8], section: &'static str) -> Result<()> {
        let r: IResult<&[u8], &[u8]> = tag(expected)(self.rest());
        match r {
            Ok(r) => {
                self.advance(r);
                Ok(())
            }
            Err(_) => Err(Error::malformed(
                section,
                self.position(),
                format!("expected {}", String::from_utf8_lossy(expected)),
            )),
        }
    }

    pub fn peek_tag(&self, expected: &[u8]) -> bool {
        self.rest().starts_with(expected)
    }
}
