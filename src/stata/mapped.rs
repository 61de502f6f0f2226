//! Formats 117 and 118: tagged sections addressed through the map.
//!
//! ```text
//! <stata_dta><header>
//!   <release>117</release><byteorder>LSF</byteorder>
//!   <K>2 bytes</K><N>4 bytes (8 in 118)</N>
//!   <label>len (1 byte, 2 in 118) + text</label>
//!   <timestamp>len (1 byte) + text</timestamp>
//! </header>
//! <map>14 x 8 byte offsets</map>
//! <variable_types>...</variable_types> ... </stata_dta>
//! ```
//!
//! Only the header and the map are read in sequence. Every other section is
//! reached by seeking to its mapped offset, so padding or reordering between
//! sections does not matter.

use log::{debug, warn};

use super::cursor::Cursor;
use super::error::{Error, Result};
use super::file::{calculate_rowsize, describe_format, Metadata};
use super::labels::{bind_value_labels, parse_value_labels_mapped};
use super::{ByteOrder, Family, Header, Release, Variable};

pub const MAGIC: &[u8] = b"<stata_dta><header><release>";

/// File positions of the tagged sections, as stored in `<map>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMap {
    pub offsets: [u64; 14],
}

impl SectionMap {
    pub const STATA_DATA: usize = 0;
    pub const MAP: usize = 1;
    pub const VARIABLE_TYPES: usize = 2;
    pub const VARNAMES: usize = 3;
    pub const SORTLIST: usize = 4;
    pub const FORMATS: usize = 5;
    pub const VALUE_LABEL_NAMES: usize = 6;
    pub const VARIABLE_LABELS: usize = 7;
    pub const CHARACTERISTICS: usize = 8;
    pub const DATA: usize = 9;
    pub const STRLS: usize = 10;
    pub const VALUE_LABELS: usize = 11;
    pub const STATA_DATA_END: usize = 12;
    pub const EOF: usize = 13;

    fn parse(c: &mut Cursor) -> Result<SectionMap> {
        c.tag(b"<map>", "map")?;
        let mut offsets = [0u64; 14];
        for o in offsets.iter_mut() {
            *o = c.u64("map")?;
        }
        c.tag(b"</map>", "map")?;
        Ok(SectionMap { offsets })
    }

    pub fn get(&self, section: usize) -> u64 {
        self.offsets[section]
    }
}

fn wrapped<'a, T>(
    c: &mut Cursor<'a>,
    open: &[u8],
    close: &[u8],
    section: &'static str,
    f: impl FnOnce(&mut Cursor<'a>) -> Result<T>,
) -> Result<T> {
    c.tag(open, section)?;
    let v = f(c)?;
    c.tag(close, section)?;
    Ok(v)
}

fn open_section(c: &mut Cursor, at: u64, open: &[u8], section: &'static str) -> Result<()> {
    c.seek(at, section)?;
    c.tag(open, section)
}

fn parse_header(c: &mut Cursor<'_>, release: Release) -> Result<Header> {
    let w = release.widths();

    c.tag(b"<stata_dta>", "header")?;
    c.tag(b"<header>", "header")?;
    let found = wrapped(c, b"<release>", b"</release>", "release", |c| {
        c.take(3, "release")
    })?;
    let found_tag = std::str::from_utf8(found)
        .ok()
        .and_then(|s| s.parse::<u16>().ok());
    if found_tag != Some(release.tag()) {
        return Err(Error::FormatMismatch {
            expected: release,
            found: format!("release {}", String::from_utf8_lossy(found)),
        });
    }

    let at = c.position();
    let byteorder = wrapped(c, b"<byteorder>", b"</byteorder>", "byteorder", |c| {
        c.take(3, "byteorder")
    })?;
    let byteorder = match byteorder {
        b"LSF" => ByteOrder::LSF,
        b"MSF" => ByteOrder::MSF,
        b => {
            return Err(Error::malformed(
                "byteorder",
                at,
                format!("unknown byte order {}", String::from_utf8_lossy(b)),
            ))
        }
    };
    c.set_order(byteorder);

    let nvars = wrapped(c, b"<K>", b"</K>", "K", |c| c.u16("K"))?;
    let nobs = wrapped(c, b"<N>", b"</N>", "N", |c| c.uint(w.nobs, "N"))?;
    let data_label = wrapped(c, b"<label>", b"</label>", "label", |c| {
        let len = c.uint(w.data_label_len, "label")?;
        c.text(len as usize, "label")
    })?;
    let timestamp = wrapped(c, b"<timestamp>", b"</timestamp>", "timestamp", |c| {
        let len = c.u8("timestamp")?;
        c.text(len as usize, "timestamp")
    })?;
    c.tag(b"</header>", "header")?;

    Ok(Header {
        release,
        byteorder,
        nvars: u32::from(nvars),
        nobs,
        data_label,
        timestamp,
    })
}

pub fn parse_metadata_mapped(input: &[u8], release: Release) -> Result<Metadata> {
    if !input.starts_with(MAGIC) {
        return Err(Error::FormatMismatch {
            expected: release,
            found: describe_format(input),
        });
    }
    let w = release.widths();
    let mut c = Cursor::new(input, ByteOrder::LSF);
    let header = parse_header(&mut c, release)?;
    debug!("{header:?}");
    let map = SectionMap::parse(&mut c)?;
    debug!("{map:?}");

    let nvars = header.nvars as usize;
    let mut vars = Vec::with_capacity(nvars);
    open_section(
        &mut c,
        map.get(SectionMap::VARIABLE_TYPES),
        b"<variable_types>",
        "variable types",
    )?;
    for i in 0..nvars {
        let at = c.position();
        let code = c.u16("variable types")?;
        vars.push(Variable::new(Family::Mapped, i, u32::from(code), at)?);
    }
    c.tag(b"</variable_types>", "variable types")?;

    open_section(&mut c, map.get(SectionMap::VARNAMES), b"<varnames>", "varnames")?;
    for v in vars.iter_mut() {
        v.name = c.text(w.varname, "varnames")?;
    }
    c.tag(b"</varnames>", "varnames")?;

    open_section(&mut c, map.get(SectionMap::FORMATS), b"<formats>", "formats")?;
    for v in vars.iter_mut() {
        v.format = c.text(w.format, "formats")?;
    }
    c.tag(b"</formats>", "formats")?;

    open_section(
        &mut c,
        map.get(SectionMap::VALUE_LABEL_NAMES),
        b"<value_label_names>",
        "value label names",
    )?;
    for v in vars.iter_mut() {
        v.value_label = c.text(w.value_label_name, "value label names")?;
    }
    c.tag(b"</value_label_names>", "value label names")?;

    open_section(
        &mut c,
        map.get(SectionMap::VARIABLE_LABELS),
        b"<variable_labels>",
        "variable labels",
    )?;
    for v in vars.iter_mut() {
        v.var_label = c.text(w.var_label, "variable labels")?;
    }
    c.tag(b"</variable_labels>", "variable labels")?;

    open_section(&mut c, map.get(SectionMap::DATA), b"<data>", "data")?;
    let data_start = c.position();
    let rowsize = calculate_rowsize(&vars);
    let data_end = rowsize
        .checked_mul(header.nobs)
        .and_then(|n| n.checked_add(data_start))
        .ok_or_else(|| Error::malformed("data", data_start, "data section size overflows"))?;
    debug!("data at {data_start}, {rowsize} bytes per observation");
    if data_end > c.len() {
        warn!("data section ends at {data_end}, past end of file ({})", c.len());
    }

    c.seek(map.get(SectionMap::VALUE_LABELS), "value labels")?;
    let tables = parse_value_labels_mapped(&mut c, w.value_label_name)?;
    bind_value_labels(&mut vars, tables);
    for v in &vars {
        debug!("{v:?}");
    }

    Ok(Metadata {
        header,
        vars,
        rowsize,
        data_start,
    })
}
