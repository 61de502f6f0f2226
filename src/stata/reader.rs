//! A decoder session over one file.
//!
//! Opening a reader decodes the header and all metadata, value labels
//! included. Observations are then served from the precomputed layout with
//! absolute-offset reads, so requests can come in any order and, through
//! [`ObservationView`], from any number of threads.

use std::fs::File;
use std::path::Path;

use log::info;
use mmap_rs::{Mmap, MmapOptions};
use rayon::prelude::*;

use super::error::{Error, Result};
use super::file::{parse_metadata, Metadata};
use super::values::{parse_field, Field};
use super::{Header, Release, Variable};

/// One observation, each field rendered as text.
pub type Observation = Vec<String>;

enum Source {
    Mapped(Mmap),
    Buffer(Vec<u8>),
}

impl Source {
    fn open(path: &Path) -> Result<Source> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Source::Buffer(Vec::new()));
        }
        let len = usize::try_from(len)
            .map_err(|_| Error::Map(format!("{} is too large to map", path.display())))?;
        // The mapping is read-only; the file must not be truncated while mapped.
        let map = unsafe {
            MmapOptions::new(len)
                .map_err(|e| Error::Map(format!("{e:?}")))?
                .with_file(&file, 0)
                .map()
                .map_err(|e| Error::Map(format!("{e:?}")))?
        };
        Ok(Source::Mapped(map))
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mapped(m) => &m[..],
            Source::Buffer(b) => b.as_slice(),
        }
    }
}

pub struct DtaReader {
    source: Source,
    meta: Metadata,
}

impl DtaReader {
    /// Opens `path` as a file of exactly `release`.
    pub fn open(path: impl AsRef<Path>, release: Release) -> Result<DtaReader> {
        let source = Source::open(path.as_ref())?;
        let meta = parse_metadata(source.bytes(), release)?;
        Ok(DtaReader { source, meta })
    }

    /// Decodes an in-memory copy of a file.
    pub fn from_bytes(bytes: Vec<u8>, release: Release) -> Result<DtaReader> {
        let source = Source::Buffer(bytes);
        let meta = parse_metadata(source.bytes(), release)?;
        Ok(DtaReader { source, meta })
    }

    pub fn header(&self) -> &Header {
        &self.meta.header
    }

    pub fn variables(&self) -> &[Variable] {
        &self.meta.vars
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    /// A borrowed, `Copy` handle for decoding observations, usable across threads.
    pub fn view(&self) -> ObservationView<'_> {
        ObservationView {
            data: self.source.bytes(),
            meta: &self.meta,
        }
    }

    /// Observation `n` (1-based); empty if `n` is out of range.
    pub fn observation(&self, n: u64) -> Result<Observation> {
        self.view().observation(n)
    }

    pub fn fields(&self, n: u64) -> Result<Vec<Field>> {
        self.view().fields(n)
    }

    /// Observations `start..=end`. Numbers outside the file give empty entries.
    pub fn observations(&self, start: u64, end: u64) -> Result<Vec<Observation>> {
        self.view().observations(start, end)
    }

    /// Every observation in the file.
    ///
    /// Holds the whole dataset as text in memory; prefer ranged reads for
    /// large files.
    pub fn all_observations(&self) -> Result<Vec<Observation>> {
        self.observations(1, self.meta.header.nobs)
    }

    /// Same result as [`observations`](Self::observations), decoded on the
    /// rayon thread pool.
    pub fn par_observations(&self, start: u64, end: u64) -> Result<Vec<Observation>> {
        let view = self.view();
        (start..=end)
            .into_par_iter()
            .map(|n| view.observation(n))
            .collect()
    }

    /// Releases the mapping. The reader cannot be used afterwards.
    pub fn close(self) {
        drop(self);
    }
}

#[derive(Clone, Copy)]
pub struct ObservationView<'a> {
    data: &'a [u8],
    meta: &'a Metadata,
}

impl<'a> ObservationView<'a> {
    pub fn nobs(&self) -> u64 {
        self.meta.header.nobs
    }

    pub fn fields(&self, n: u64) -> Result<Vec<Field>> {
        let Some(offset) = self.meta.observation_offset(n) else {
            return Ok(Vec::new());
        };
        let record = offset
            .checked_add(self.meta.rowsize)
            .and_then(|end| self.data.get(offset as usize..end as usize))
            .ok_or_else(|| {
                Error::malformed(
                    "data",
                    offset,
                    format!("observation {n} runs past end of file"),
                )
            })?;
        let order = self.meta.header.byteorder;
        let mut buf = record;
        let mut fields = Vec::with_capacity(self.meta.vars.len());
        for v in &self.meta.vars {
            let at = offset + (record.len() - buf.len()) as u64;
            let f;
            (buf, f) = parse_field(buf, v.ty, order, at)?;
            fields.push(f);
        }
        Ok(fields)
    }

    pub fn observation(&self, n: u64) -> Result<Observation> {
        Ok(self.fields(n)?.iter().map(Field::to_string).collect())
    }

    pub fn observations(&self, start: u64, end: u64) -> Result<Vec<Observation>> {
        (start..=end).map(|n| self.observation(n)).collect()
    }
}

/// Tries every supported release in turn and returns the first reader that
/// opens. If none matches, the last format mismatch is returned.
pub fn open_any(path: impl AsRef<Path>) -> Result<DtaReader> {
    let path = path.as_ref();
    let source = Source::open(path)?;
    let mut mismatch = None;
    for release in Release::PROBE_ORDER {
        match parse_metadata(source.bytes(), release) {
            Ok(meta) => return Ok(DtaReader { source, meta }),
            Err(e) if e.is_format_mismatch() => {
                info!("{} is not a format {release} file", path.display());
                mismatch = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(mismatch.unwrap_or_else(|| Error::malformed("header", 0, "no release to try")))
}
