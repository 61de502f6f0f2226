use std::{collections::HashMap, fmt, sync::Arc};

use nom::number::Endianness;

pub mod cursor;
pub mod error;
pub mod file;
pub mod labels;
pub mod legacy;
pub mod mapped;
pub mod reader;
pub mod values;

use error::{Error, Result};

/// The on-disk layout revisions this crate can decode.
///
/// Each revision carries a small table of field widths; the decoding
/// algorithms themselves are shared per [`Family`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Release {
    V113,
    V114,
    V115,
    V117,
    V118,
}

/// Layouts that share a decoding algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Fixed binary offsets, sections read back to back.
    Legacy,
    /// Tagged sections located through the 14-entry offset map.
    Mapped,
}

/// Per-revision field widths, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widths {
    pub varname: usize,
    pub format: usize,
    pub value_label_name: usize,
    pub var_label: usize,
    /// Width of the observation count in the header.
    pub nobs: usize,
    /// Width of the data label length prefix (mapped family only).
    pub data_label_len: usize,
}

const LEGACY_113: Widths = Widths {
    varname: 33,
    format: 12,
    value_label_name: 33,
    var_label: 81,
    nobs: 4,
    data_label_len: 0,
};

const LEGACY_114: Widths = Widths {
    format: 49,
    ..LEGACY_113
};

const MAPPED_117: Widths = Widths {
    varname: 33,
    format: 49,
    value_label_name: 33,
    var_label: 81,
    nobs: 4,
    data_label_len: 1,
};

const MAPPED_118: Widths = Widths {
    varname: 129,
    format: 57,
    value_label_name: 129,
    var_label: 321,
    nobs: 8,
    data_label_len: 2,
};

impl Release {
    /// Order in which [`reader::open_any`] tries the revisions.
    pub const PROBE_ORDER: [Release; 5] = [
        Release::V115,
        Release::V114,
        Release::V113,
        Release::V117,
        Release::V118,
    ];

    pub fn from_tag(tag: u16) -> Option<Release> {
        match tag {
            113 => Some(Release::V113),
            114 => Some(Release::V114),
            115 => Some(Release::V115),
            117 => Some(Release::V117),
            118 => Some(Release::V118),
            _ => None,
        }
    }

    pub fn tag(self) -> u16 {
        match self {
            Release::V113 => 113,
            Release::V114 => 114,
            Release::V115 => 115,
            Release::V117 => 117,
            Release::V118 => 118,
        }
    }

    pub fn family(self) -> Family {
        match self {
            Release::V113 | Release::V114 | Release::V115 => Family::Legacy,
            Release::V117 | Release::V118 => Family::Mapped,
        }
    }

    pub fn widths(self) -> &'static Widths {
        match self {
            Release::V113 => &LEGACY_113,
            Release::V114 | Release::V115 => &LEGACY_114,
            Release::V117 => &MAPPED_117,
            Release::V118 => &MAPPED_118,
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// LSF = little endian, MSF = big endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LSF,
    MSF,
}

impl ByteOrder {
    pub fn endianness(self) -> Endianness {
        match self {
            ByteOrder::LSF => Endianness::Little,
            ByteOrder::MSF => Endianness::Big,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Fixed width text; the payload is the width in bytes.
    TStr(u16),
    TByte,
    TInt,
    TLong,
    TFloat,
    TDouble,
}

impl VarType {
    /// Interprets a raw type code relative to the owning family.
    ///
    /// The same integer can mean "text of that length" in one family and a
    /// numeric sentinel in the other, so the family is always required.
    pub fn classify(family: Family, code: u32) -> Option<VarType> {
        match family {
            Family::Legacy => match code {
                1..=244 => Some(VarType::TStr(code as u16)),
                251 => Some(VarType::TByte),
                252 => Some(VarType::TInt),
                253 => Some(VarType::TLong),
                254 => Some(VarType::TFloat),
                255 => Some(VarType::TDouble),
                _ => None,
            },
            Family::Mapped => match code {
                1..=2045 => Some(VarType::TStr(code as u16)),
                65530 => Some(VarType::TByte),
                65529 => Some(VarType::TInt),
                65528 => Some(VarType::TLong),
                65527 => Some(VarType::TFloat),
                65526 => Some(VarType::TDouble),
                _ => None,
            },
        }
    }

    /// Bytes occupied in each observation record.
    pub fn width(self) -> usize {
        match self {
            VarType::TStr(n) => n as usize,
            VarType::TByte => 1,
            VarType::TInt => 2,
            VarType::TLong | VarType::TFloat => 4,
            VarType::TDouble => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Header {
    pub release: Release,
    pub byteorder: ByteOrder,
    pub nvars: u32,
    pub nobs: u64,
    pub data_label: String,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub type_code: u32,
    pub ty: VarType,
    pub name: String,
    pub format: String,
    pub value_label: String,
    pub var_label: String,
    pub dictionary: Option<Arc<ValueLabelTable>>,
}

impl Variable {
    pub(crate) fn new(family: Family, index: usize, type_code: u32, offset: u64) -> Result<Variable> {
        let ty = VarType::classify(family, type_code).ok_or_else(|| {
            Error::malformed(
                "variable types",
                offset,
                format!("unrecognized type code {type_code} for variable {index}"),
            )
        })?;
        Ok(Variable {
            type_code,
            ty,
            name: String::new(),
            format: String::new(),
            value_label: String::new(),
            var_label: String::new(),
            dictionary: None,
        })
    }

    pub fn is_string(&self) -> bool {
        matches!(self.ty, VarType::TStr(_))
    }

    pub fn is_byte(&self) -> bool {
        self.ty == VarType::TByte
    }

    pub fn is_int(&self) -> bool {
        self.ty == VarType::TInt
    }

    pub fn is_long(&self) -> bool {
        self.ty == VarType::TLong
    }

    pub fn is_float(&self) -> bool {
        self.ty == VarType::TFloat
    }

    pub fn is_double(&self) -> bool {
        self.ty == VarType::TDouble
    }

    /// True for the date and time display formats (`%d...`, `%t...`).
    pub fn is_date(&self) -> bool {
        ["%d", "%-d", "%t", "%-t"]
            .iter()
            .any(|p| self.format.starts_with(p))
    }

    /// Looks up the label for a value rendered as text, e.g. `"1"`.
    pub fn label_for(&self, value: &str) -> Option<&str> {
        self.dictionary
            .as_ref()
            .and_then(|d| d.labels.get(value))
            .map(String::as_str)
    }
}

/// A named value label dictionary. Keys are the decimal text of the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueLabelTable {
    pub labelname: String,
    pub labels: HashMap<String, String>,
}
