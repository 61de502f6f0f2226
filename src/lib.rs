//! Read-only decoding of Stata `.dta` files, formats 113 through 118.
//!
//! ```no_run
//! use dtaread::stata::{reader::DtaReader, Release};
//!
//! let reader = DtaReader::open("auto.dta", Release::V117)?;
//! println!("{} observations", reader.header().nobs);
//! for field in reader.observation(1)? {
//!     print!("{field} ");
//! }
//! # Ok::<(), dtaread::stata::error::Error>(())
//! ```

pub mod concurrency;
pub mod stata;

pub use stata::error::{Error, Result};
pub use stata::reader::{open_any, DtaReader, Observation, ObservationView};
pub use stata::{Header, Release, Variable};
