use std::borrow::Cow;
use std::io;

use nom::Finish;
use nom::IResult;

use super::Release;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file does not carry the revision this decoder was asked for.
    /// Recoverable: a dispatcher moves on to the next revision.
    #[error("not a format {expected} dta file (found {found})")]
    FormatMismatch { expected: Release, found: String },

    /// Truncated reads, unknown type codes and inconsistent tables.
    #[error("malformed {section} at offset {offset}: {details}")]
    Malformed {
        section: Cow<'static, str>,
        offset: u64,
        details: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("cannot map file: {0}")]
    Map(String),
}

impl Error {
    pub fn malformed(
        section: impl Into<Cow<'static, str>>,
        offset: u64,
        details: impl Into<String>,
    ) -> Error {
        Error::Malformed {
            section: section.into(),
            offset,
            details: details.into(),
        }
    }

    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Error::FormatMismatch { .. })
    }
}

pub trait DownstreamError {
    type MappedResult;
    fn map_res(self, section: &'static str, offset: u64) -> Self::MappedResult;
}

impl<I, O> DownstreamError for IResult<I, O> {
    type MappedResult = Result<(I, O)>;
    fn map_res(self, section: &'static str, offset: u64) -> Self::MappedResult {
        self.finish()
            .map_err(|e| Error::malformed(section, offset, format!("{:?}", e.code)))
    }
}
