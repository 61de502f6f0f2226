use super::error::Result;
use super::legacy::parse_metadata_legacy;
use super::mapped::{parse_metadata_mapped, MAGIC};
use super::{Family, Header, Release, Variable};

/// Everything decoded from a file ahead of its observations.
///
/// Computed once when a reader is opened and never changed afterwards.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub header: Header,
    pub vars: Vec<Variable>,
    /// Bytes per observation.
    pub rowsize: u64,
    /// Absolute offset of observation 1.
    pub data_start: u64,
}

impl Metadata {
    /// Absolute offset of the 1-based observation `n`, or `None` when `n` is
    /// out of range.
    pub fn observation_offset(&self, n: u64) -> Option<u64> {
        if n == 0 || n > self.header.nobs {
            return None;
        }
        (n - 1)
            .checked_mul(self.rowsize)
            .and_then(|o| o.checked_add(self.data_start))
    }
}

/// Decodes header and metadata, including value labels, for `release`.
///
/// Fails with `FormatMismatch` when the file declares another revision.
pub fn parse_metadata(input: &[u8], release: Release) -> Result<Metadata> {
    match release.family() {
        Family::Legacy => parse_metadata_legacy(input, release),
        Family::Mapped => parse_metadata_mapped(input, release),
    }
}

pub fn calculate_rowsize(vars: &[Variable]) -> u64 {
    vars.iter().map(|v| v.ty.width() as u64).sum()
}

/// Short description of what a file claims to be, for mismatch errors.
pub fn describe_format(input: &[u8]) -> String {
    if let Some(rest) = input.strip_prefix(MAGIC) {
        let n = rest.len().min(3);
        format!("release {}", String::from_utf8_lossy(&rest[..n]))
    } else if let Some(b) = input.first() {
        format!("format byte {b}")
    } else {
        String::from("empty file")
    }
}
