//! Formats 113, 114 and 115: fixed binary header followed by sections read
//! back to back.
//!
//! ```text
//! header      109   release, byteorder, filetype, unused, K (2), N (4),
//!                   data label (81), timestamp (18)
//! typlist       K
//! varlist    33*K
//! srtlist  2*(K+1)
//! fmtlist    12*K (113) or 49*K
//! lbllist    33*K
//! varlabels  81*K
//! expansion fields, (type 1, len 4, payload) until len is 0
//! data       N * rowsize
//! value labels up to end of file
//! ```

use log::{debug, info, warn};

use super::cursor::Cursor;
use super::error::{Error, Result};
use super::file::{calculate_rowsize, describe_format, Metadata};
use super::labels::{bind_value_labels, parse_value_labels_legacy};
use super::{ByteOrder, Family, Header, Release, Variable};

pub fn parse_metadata_legacy(input: &[u8], release: Release) -> Result<Metadata> {
    let w = release.widths();
    let mut c = Cursor::new(input, ByteOrder::LSF);

    if input.first().map(|&v| u16::from(v)) != Some(release.tag()) {
        return Err(Error::FormatMismatch {
            expected: release,
            found: describe_format(input),
        });
    }
    c.skip(1, "header")?;
    let byteorder = match c.u8("header")? {
        1 => ByteOrder::MSF,
        2 => ByteOrder::LSF,
        b => {
            return Err(Error::malformed(
                "header",
                1,
                format!("unknown byte order {b}"),
            ))
        }
    };
    c.set_order(byteorder);
    // filetype, unused
    c.skip(2, "header")?;
    let nvars = c.u16("header")?;
    let nobs = c.u32("header")?;
    let data_label = c.text(81, "header")?;
    let timestamp = c.text(18, "header")?;
    let header = Header {
        release,
        byteorder,
        nvars: u32::from(nvars),
        nobs: u64::from(nobs),
        data_label,
        timestamp,
    };
    debug!("{header:?}");

    let nvars = nvars as usize;
    let mut vars = Vec::with_capacity(nvars);
    for i in 0..nvars {
        let at = c.position();
        let code = c.u8("typlist")?;
        vars.push(Variable::new(Family::Legacy, i, u32::from(code), at)?);
    }
    for v in vars.iter_mut() {
        v.name = c.text(w.varname, "varlist")?;
    }
    c.skip(2 * (nvars + 1), "srtlist")?;
    for v in vars.iter_mut() {
        v.format = c.text(w.format, "fmtlist")?;
    }
    for v in vars.iter_mut() {
        v.value_label = c.text(w.value_label_name, "lbllist")?;
    }
    for v in vars.iter_mut() {
        v.var_label = c.text(w.var_label, "variable labels")?;
    }
    skip_expansion_fields(&mut c)?;

    let data_start = c.position();
    let rowsize = calculate_rowsize(&vars);
    let labels_start = rowsize
        .checked_mul(header.nobs)
        .and_then(|n| n.checked_add(data_start))
        .ok_or_else(|| Error::malformed("data", data_start, "data section size overflows"))?;
    debug!("data at {data_start}, {rowsize} bytes per observation");

    if labels_start < c.len() {
        info!("value labels present at {labels_start}");
        c.seek(labels_start, "value labels")?;
        let tables = parse_value_labels_legacy(&mut c, w.value_label_name)?;
        bind_value_labels(&mut vars, tables);
    } else if labels_start > c.len() {
        warn!(
            "data section ends at {labels_start}, past end of file ({})",
            c.len()
        );
    }
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

fn skip_expansion_fields(c: &mut Cursor) -> Result<()> {
    loop {
        let _kind = c.u8("expansion fields")?;
        let len = c.u32("expansion fields")?;
        if len == 0 {
            return Ok(());
        }
        c.skip(len as usize, "expansion fields")?;
    }
}
