use clap::Parser;

use nom::bytes::complete as nombc;
use nom::character::complete as nomcc;

use dtaread::stata::Release;

/// Observations requested on the command line, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObsRange {
    pub start: u64,
    /// `None` runs to the last observation.
    pub end: Option<u64>,
}

impl ObsRange {
    pub fn resolve(self, nobs: u64) -> (u64, u64) {
        (self.start, self.end.unwrap_or(nobs).min(nobs))
    }
}

///Print the contents of a Stata DTA file as CSV
#[derive(Parser)]
pub struct Args {
    ///The input DTA file
    pub infile: std::path::PathBuf,
    ///Read as this format (113, 114, 115, 117, 118) instead of probing
    #[arg(long, value_parser = release_parser)]
    pub release: Option<Release>,
    ///Observations to print: N, N-M or N- (default: all)
    #[arg(long, value_parser = range_parser)]
    pub range: Option<ObsRange>,
    ///Print the header
    #[arg(long)]
    pub header: bool,
    ///Print one row per variable
    #[arg(long)]
    pub variables: bool,
    ///Print the value label dictionaries
    #[arg(long)]
    pub labels: bool,
    ///Decoding threads (default: available parallelism)
    #[arg(long)]
    pub threads: Option<usize>,
}

fn release_parser(s: &str) -> Result<Release, &'static str> {
    match p_release(s) {
        Ok((_, r)) => Ok(r),
        Err(_) => Err("Release must be one of 113, 114, 115, 117, 118"),
    }
}

fn range_parser(s: &str) -> Result<ObsRange, &'static str> {
    match p_range(s) {
        Ok((_, r)) if r.start > 0 && r.end.map_or(true, |e| e >= r.start) => Ok(r),
        _ => Err("Invalid observation range"),
    }
}

fn p_release(s: &str) -> nom::IResult<&str, Release> {
    let (s, r) = nom::combinator::map_opt(nomcc::u16, Release::from_tag)(s)?;
    let (s, _) = nom::combinator::eof(s)?;
    Ok((s, r))
}

fn p_range(s: &str) -> nom::IResult<&str, ObsRange> {
    let (s, start) = nomcc::u64(s)?;
    let (s, end) = nom::combinator::opt(nom::sequence::preceded(
        nombc::tag("-"),
        nom::combinator::opt(nomcc::u64),
    ))(s)?;
    let (s, _) = nom::combinator::eof(s)?;
    let end = match end {
        None => Some(start),
        Some(e) => e,
    };
    Ok((s, ObsRange { start, end }))
}
