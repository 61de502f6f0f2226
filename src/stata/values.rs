use std::{fmt, ops::RangeInclusive};

use nom::{
    bytes::complete::take,
    combinator::map,
    number::{complete as num, Endianness},
    IResult,
};

use super::error::{DownstreamError, Result};
use super::{ByteOrder, VarType};

/// `None` marks a missing value.
pub type Value<T> = Option<T>;

pub const VALID_BYTE: RangeInclusive<i8> = -127..=100;
pub const VALID_INT: RangeInclusive<i16> = -32767..=32740;
pub const VALID_LONG: RangeInclusive<i32> = -2147483647..=2147483620;
pub const VALID_FLOAT: RangeInclusive<f32> = -1.701e38..=1.701e38;
pub const MISSING_DOUBLE: RangeInclusive<f64> = (8.988e307 + 1.0)..=(8.988e307 + 27.0);

/// Text rendering of a missing value.
pub const MISSING_MARKER: &str = ".";

/// One decoded cell of an observation.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Missing,
    Byte(i8),
    Int(i16),
    Long(i32),
    Float(f32),
    Double(f64),
    Str(String),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Missing => f.write_str(MISSING_MARKER),
            Field::Byte(v) => write!(f, "{v}"),
            Field::Int(v) => write!(f, "{v}"),
            Field::Long(v) => write!(f, "{v}"),
            // keeps the fractional part of integral values, e.g. "-3.0"
            Field::Float(v) => write!(f, "{v:?}"),
            Field::Double(v) => write!(f, "{v:?}"),
            Field::Str(s) => f.write_str(s),
        }
    }
}

impl<T> From<Value<T>> for Field
where
    T: Into<Field>,
{
    fn from(v: Value<T>) -> Field {
        v.map_or(Field::Missing, Into::into)
    }
}

impl From<i8> for Field {
    fn from(v: i8) -> Field {
        Field::Byte(v)
    }
}

impl From<i16> for Field {
    fn from(v: i16) -> Field {
        Field::Int(v)
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Field {
        Field::Long(v)
    }
}

impl From<f32> for Field {
    fn from(v: f32) -> Field {
        Field::Float(v)
    }
}

impl From<f64> for Field {
    fn from(v: f64) -> Field {
        Field::Double(v)
    }
}

pub fn parse_byte(buf: &[u8]) -> IResult<&[u8], Value<i8>> {
    map(num::i8, |i| Some(i).filter(|i| VALID_BYTE.contains(i)))(buf)
}

pub fn parse_int(order: Endianness) -> impl Fn(&[u8]) -> IResult<&[u8], Value<i16>> {
    move |buf| map(num::i16(order), |i| Some(i).filter(|i| VALID_INT.contains(i)))(buf)
}

pub fn parse_long(order: Endianness) -> impl Fn(&[u8]) -> IResult<&[u8], Value<i32>> {
    move |buf| map(num::i32(order), |i| Some(i).filter(|i| VALID_LONG.contains(i)))(buf)
}

/// The bounded range is the valid one; anything outside it, NaN included,
/// is reported missing.
pub fn parse_float(order: Endianness) -> impl Fn(&[u8]) -> IResult<&[u8], Value<f32>> {
    move |buf| map(num::f32(order), |f| Some(f).filter(|f| VALID_FLOAT.contains(f)))(buf)
}

pub fn parse_double(order: Endianness) -> impl Fn(&[u8]) -> IResult<&[u8], Value<f64>> {
    move |buf| map(num::f64(order), |d| Some(d).filter(|d| !MISSING_DOUBLE.contains(d)))(buf)
}

pub fn parse_str(width: usize) -> impl Fn(&[u8]) -> IResult<&[u8], String> {
    move |buf| map(take(width), bytes_to_string)(buf)
}

/// Decodes one field of type `ty` from the front of `buf`.
///
/// `offset` is only used for error reporting.
pub fn parse_field<'a>(
    buf: &'a [u8],
    ty: VarType,
    order: ByteOrder,
    offset: u64,
) -> Result<(&'a [u8], Field)> {
    let e = order.endianness();
    match ty {
        VarType::TStr(n) => parse_str(n as usize)(buf)
            .map_res("data", offset)
            .map(|(b, s)| (b, Field::Str(s))),
        VarType::TByte => parse_byte(buf)
            .map_res("data", offset)
            .map(|(b, v)| (b, v.into())),
        VarType::TInt => parse_int(e)(buf)
            .map_res("data", offset)
            .map(|(b, v)| (b, v.into())),
        VarType::TLong => parse_long(e)(buf)
            .map_res("data", offset)
            .map(|(b, v)| (b, v.into())),
        VarType::TFloat => parse_float(e)(buf)
            .map_res("data", offset)
            .map(|(b, v)| (b, v.into())),
        VarType::TDouble => parse_double(e)(buf)
            .map_res("data", offset)
            .map(|(b, v)| (b, v.into())),
    }
}

/// Null terminated text. Bytes after the first NUL are padding.
///
/// Newer files are UTF-8; older ones use a single byte code page, which is
/// read as Latin-1 when the bytes are not valid UTF-8.
pub fn bytes_to_string(bs: &[u8]) -> String {
    let bs = match bs.iter().position(|&x| x == 0) {
        Some(n) => &bs[..n],
        None => bs,
    };
    match std::str::from_utf8(bs) {
        Ok(s) => s.to_owned(),
        Err(_) => bs.iter().map(|&b| b as char).collect(),
    }
}
