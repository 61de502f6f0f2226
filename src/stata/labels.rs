//! Value label dictionaries.
//!
//! Every revision stores the same table body:
//!
//! ```text
//! len        4   length of the table that follows the padding
//! labname    w   NUL terminated (33 bytes, 129 in 118)
//! padding    3
//! n          4   number of entries
//! txtlen     4   length of txt[]
//! off[]    4*n   offsets into txt[]
//! val[]    4*n   values
//! txt[]  txtlen  NUL terminated labels
//! ```
//!
//! Legacy files repeat tables up to end of file; mapped files wrap each one
//! in `<lbl>...</lbl>` inside `<value_labels>...</value_labels>`.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use super::cursor::Cursor;
use super::error::{Error, Result};
use super::values::bytes_to_string;
use super::{ValueLabelTable, Variable};

const SECTION: &str = "value labels";

pub fn parse_value_label_table(c: &mut Cursor, name_width: usize) -> Result<ValueLabelTable> {
    let start = c.position();
    let len = c.u32(SECTION)? as u64;
    let labelname = c.text(name_width, SECTION)?;
    c.skip(3, SECTION)?;
    let n = c.u32(SECTION)? as u64;
    let txtlen = c.u32(SECTION)? as u64;

    let body = 8 * n + txtlen;
    if body > c.len() - c.position() {
        return Err(Error::malformed(
            SECTION,
            start,
            format!("table {labelname:?} with {n} entries runs past end of file"),
        ));
    }
    if len != body + 8 {
        warn!("value label table {labelname:?} declares {len} bytes, contents use {}", body + 8);
    }

    let n = n as usize;
    let mut offsets = Vec::with_capacity(n);
    for _ in 0..n {
        offsets.push(c.u32(SECTION)? as usize);
    }
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(c.i32(SECTION)?);
    }
    let txt_at = c.position();
    let txt = c.take(txtlen as usize, SECTION)?;

    let mut labels = HashMap::with_capacity(n);
    for (i, (&o, &v)) in offsets.iter().zip(&values).enumerate() {
        if o > txt.len() {
            return Err(Error::malformed(
                SECTION,
                txt_at,
                format!("label {i} of {labelname:?} starts at {o}, text is {} bytes", txt.len()),
            ));
        }
        let end = match offsets.get(i + 1) {
            Some(&next) if next >= o => next.min(txt.len()),
            Some(&next) => {
                warn!("label offsets of {labelname:?} decrease at entry {i} ({o} > {next})");
                txt.len()
            }
            None => txt.len(),
        };
        labels.insert(v.to_string(), bytes_to_string(&txt[o..end]));
    }
    debug!("value labels {labelname:?}: {} entries at {start}", labels.len());
    Ok(ValueLabelTable { labelname, labels })
}

/// Tables follow one another until end of file.
pub fn parse_value_labels_legacy(c: &mut Cursor, name_width: usize) -> Result<Vec<ValueLabelTable>> {
    let mut tables = Vec::new();
    while !c.at_end() {
        tables.push(parse_value_label_table(c, name_width)?);
    }
    Ok(tables)
}

/// Expects the cursor on `<value_labels>`.
pub fn parse_value_labels_mapped(c: &mut Cursor, name_width: usize) -> Result<Vec<ValueLabelTable>> {
    c.tag(b"<value_labels>", SECTION)?;
    let mut tables = Vec::new();
    while c.peek_tag(b"<lbl>") {
        c.tag(b"<lbl>", SECTION)?;
        tables.push(parse_value_label_table(c, name_width)?);
        c.tag(b"</lbl>", SECTION)?;
    }
    c.tag(b"</value_labels>", SECTION)?;
    Ok(tables)
}

/// Attaches each table to every variable naming it.
///
/// Tables sharing a name are merged first; tables nobody names are dropped.
pub fn bind_value_labels(vars: &mut [Variable], tables: Vec<ValueLabelTable>) {
    let mut by_name: HashMap<String, ValueLabelTable> = HashMap::new();
    for t in tables {
        match by_name.get_mut(&t.labelname) {
            Some(existing) => existing.labels.extend(t.labels),
            None => {
                by_name.insert(t.labelname.clone(), t);
            }
        }
    }
    let by_name: HashMap<String, Arc<ValueLabelTable>> = by_name
        .into_iter()
        .map(|(k, t)| (k, Arc::new(t)))
        .collect();
    for v in vars.iter_mut().filter(|v| !v.value_label.is_empty()) {
        v.dictionary = by_name.get(&v.value_label).cloned();
    }
}
