#![allow(dead_code)]

//! Builds small synthetic `.dta` files for every supported release.

use dtaread::stata::{ByteOrder, Family, Release};

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Byte,
    Int,
    Long,
    Float,
    Double,
    Str(u16),
}

#[derive(Debug, Clone)]
pub enum Cell {
    Int(i64),
    Real(f64),
    Text(&'static [u8]),
}

#[derive(Debug, Clone)]
pub struct Var {
    pub name: &'static str,
    pub kind: Kind,
    pub format: &'static str,
    pub value_label: &'static str,
    pub label: &'static str,
}

pub fn var(name: &'static str, kind: Kind) -> Var {
    let format = match kind {
        Kind::Str(_) => "%8s",
        _ => "%9.0g",
    };
    Var {
        name,
        kind,
        format,
        value_label: "",
        label: "",
    }
}

impl Var {
    pub fn format(mut self, format: &'static str) -> Var {
        self.format = format;
        self
    }

    pub fn labelled(mut self, value_label: &'static str) -> Var {
        self.value_label = value_label;
        self
    }

    pub fn described(mut self, label: &'static str) -> Var {
        self.label = label;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: &'static str,
    pub entries: Vec<(i32, &'static str)>,
}

#[derive(Debug, Clone)]
pub struct Dta {
    pub release: Release,
    pub order: ByteOrder,
    pub label: String,
    pub timestamp: String,
    pub vars: Vec<Var>,
    pub rows: Vec<Vec<Cell>>,
    pub tables: Vec<Table>,
    /// Mapped releases only: lay the sections out in reverse map order.
    pub permute: bool,
}

struct Out {
    buf: Vec<u8>,
    order: ByteOrder,
}

macro_rules! put {
    ($name:ident, $t:ty) => {
        fn $name(&mut self, v: $t) {
            match self.order {
                ByteOrder::LSF => self.buf.extend_from_slice(&v.to_le_bytes()),
                ByteOrder::MSF => self.buf.extend_from_slice(&v.to_be_bytes()),
            }
        }
    };
}

impl Out {
    fn new(order: ByteOrder) -> Out {
        Out {
            buf: Vec::new(),
            order,
        }
    }

    put!(u8, u8);
    put!(i8, i8);
    put!(u16, u16);
    put!(i16, i16);
    put!(u32, u32);
    put!(i32, i32);
    put!(u64, u64);
    put!(f32, f32);
    put!(f64, f64);

    fn raw(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// NUL padded (or truncated) to `width`.
    fn fixed(&mut self, b: &[u8], width: usize) {
        let mut v = b.to_vec();
        v.resize(width, 0);
        self.raw(&v);
    }

    fn len(&self) -> u64 {
        self.buf.len() as u64
    }
}

impl Dta {
    pub fn new(release: Release) -> Dta {
        Dta {
            release,
            order: ByteOrder::LSF,
            label: String::from("synthetic data"),
            timestamp: String::from("17 Oct 2026 10:00"),
            vars: Vec::new(),
            rows: Vec::new(),
            tables: Vec::new(),
            permute: false,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        match self.release.family() {
            Family::Legacy => self.build_legacy(),
            Family::Mapped => self.build_mapped(),
        }
    }

    fn type_code(&self, kind: Kind) -> u16 {
        match (self.release.family(), kind) {
            (_, Kind::Str(n)) => n,
            (Family::Legacy, Kind::Byte) => 251,
            (Family::Legacy, Kind::Int) => 252,
            (Family::Legacy, Kind::Long) => 253,
            (Family::Legacy, Kind::Float) => 254,
            (Family::Legacy, Kind::Double) => 255,
            (Family::Mapped, Kind::Byte) => 65530,
            (Family::Mapped, Kind::Int) => 65529,
            (Family::Mapped, Kind::Long) => 65528,
            (Family::Mapped, Kind::Float) => 65527,
            (Family::Mapped, Kind::Double) => 65526,
        }
    }

    fn data(&self, o: &mut Out) {
        for row in &self.rows {
            for (v, c) in self.vars.iter().zip(row) {
                match (v.kind, c) {
                    (Kind::Byte, Cell::Int(i)) => o.i8(*i as i8),
                    (Kind::Int, Cell::Int(i)) => o.i16(*i as i16),
                    (Kind::Long, Cell::Int(i)) => o.i32(*i as i32),
                    (Kind::Float, Cell::Real(f)) => o.f32(*f as f32),
                    (Kind::Double, Cell::Real(f)) => o.f64(*f),
                    (Kind::Str(n), Cell::Text(t)) => o.fixed(t, n as usize),
                    (k, c) => panic!("{c:?} does not fit a {k:?} variable"),
                }
            }
        }
    }

    fn table(&self, o: &mut Out, t: &Table) {
        let w = self.release.widths();
        let mut txt = Vec::new();
        let mut offsets = Vec::new();
        for (_, l) in &t.entries {
            offsets.push(txt.len() as u32);
            txt.extend_from_slice(l.as_bytes());
            txt.push(0);
        }
        o.u32((8 + 8 * t.entries.len() + txt.len()) as u32);
        o.fixed(t.name.as_bytes(), w.value_label_name);
        o.raw(&[0; 3]);
        o.u32(t.entries.len() as u32);
        o.u32(txt.len() as u32);
        for off in offsets {
            o.u32(off);
        }
        for (v, _) in &t.entries {
            o.i32(*v);
        }
        o.raw(&txt);
    }

    fn build_legacy(&self) -> Vec<u8> {
        let w = self.release.widths();
        let mut o = Out::new(self.order);
        o.u8(self.release.tag() as u8);
        o.u8(match self.order {
            ByteOrder::MSF => 1,
            ByteOrder::LSF => 2,
        });
        o.u8(1);
        o.u8(0);
        o.u16(self.vars.len() as u16);
        o.u32(self.rows.len() as u32);
        o.fixed(self.label.as_bytes(), 81);
        o.fixed(self.timestamp.as_bytes(), 18);
        for v in &self.vars {
            o.u8(self.type_code(v.kind) as u8);
        }
        for v in &self.vars {
            o.fixed(v.name.as_bytes(), w.varname);
        }
        o.fixed(&[], 2 * (self.vars.len() + 1));
        for v in &self.vars {
            o.fixed(v.format.as_bytes(), w.format);
        }
        for v in &self.vars {
            o.fixed(v.value_label.as_bytes(), w.value_label_name);
        }
        for v in &self.vars {
            o.fixed(v.label.as_bytes(), w.var_label);
        }
        // one characteristic, then the terminator
        o.u8(1);
        o.u32(4);
        o.raw(b"note");
        o.u8(0);
        o.u32(0);
        self.data(&mut o);
        for t in &self.tables {
            self.table(&mut o, t);
        }
        o.buf
    }

    fn section(&self, open: &[u8], close: &[u8], body: impl FnOnce(&mut Out)) -> Vec<u8> {
        let mut o = Out::new(self.order);
        o.raw(open);
        body(&mut o);
        o.raw(close);
        o.buf
    }

    fn build_mapped(&self) -> Vec<u8> {
        let w = self.release.widths();
        let nvars = self.vars.len();

        let mut sections = vec![
            (
                2,
                self.section(b"<variable_types>", b"</variable_types>", |o| {
                    for v in &self.vars {
                        o.u16(self.type_code(v.kind));
                    }
                }),
            ),
            (
                3,
                self.section(b"<varnames>", b"</varnames>", |o| {
                    for v in &self.vars {
                        o.fixed(v.name.as_bytes(), w.varname);
                    }
                }),
            ),
            (
                4,
                self.section(b"<sortlist>", b"</sortlist>", |o| {
                    o.fixed(&[], 2 * (nvars + 1));
                }),
            ),
            (
                5,
                self.section(b"<formats>", b"</formats>", |o| {
                    for v in &self.vars {
                        o.fixed(v.format.as_bytes(), w.format);
                    }
                }),
            ),
            (
                6,
                self.section(b"<value_label_names>", b"</value_label_names>", |o| {
                    for v in &self.vars {
                        o.fixed(v.value_label.as_bytes(), w.value_label_name);
                    }
                }),
            ),
            (
                7,
                self.section(b"<variable_labels>", b"</variable_labels>", |o| {
                    for v in &self.vars {
                        o.fixed(v.label.as_bytes(), w.var_label);
                    }
                }),
            ),
            (
                8,
                self.section(b"<characteristics>", b"</characteristics>", |_| {}),
            ),
            (9, self.section(b"<data>", b"</data>", |o| self.data(o))),
            (10, self.section(b"<strls>", b"</strls>", |_| {})),
            (
                11,
                self.section(b"<value_labels>", b"</value_labels>", |o| {
                    for t in &self.tables {
                        o.raw(b"<lbl>");
                        self.table(o, t);
                        o.raw(b"</lbl>");
                    }
                }),
            ),
        ];
        if self.permute {
            sections.reverse();
        }

        let mut o = Out::new(self.order);
        o.raw(b"<stata_dta><header><release>");
        o.raw(self.release.to_string().as_bytes());
        o.raw(b"</release><byteorder>");
        o.raw(match self.order {
            ByteOrder::LSF => b"LSF",
            ByteOrder::MSF => b"MSF",
        });
        o.raw(b"</byteorder><K>");
        o.u16(nvars as u16);
        o.raw(b"</K><N>");
        match w.nobs {
            8 => o.u64(self.rows.len() as u64),
            _ => o.u32(self.rows.len() as u32),
        }
        o.raw(b"</N><label>");
        match w.data_label_len {
            2 => o.u16(self.label.len() as u16),
            _ => o.u8(self.label.len() as u8),
        }
        o.raw(self.label.as_bytes());
        o.raw(b"</label><timestamp>");
        o.u8(self.timestamp.len() as u8);
        o.raw(self.timestamp.as_bytes());
        o.raw(b"</timestamp></header>");

        let map_at = o.len();
        let mut offsets = [0u64; 14];
        offsets[1] = map_at;
        let mut at = map_at + (b"<map>".len() + 14 * 8 + b"</map>".len()) as u64;
        for (i, blob) in &sections {
            offsets[*i] = at;
            at += blob.len() as u64;
        }
        offsets[12] = at;
        offsets[13] = at + b"</stata_dta>".len() as u64;

        o.raw(b"<map>");
        for off in offsets {
            o.u64(off);
        }
        o.raw(b"</map>");
        for (_, blob) in &sections {
            o.raw(blob);
        }
        o.raw(b"</stata_dta>");
        o.buf
    }
}

/// Six variables, one of each kind, over three observations. The third
/// observation holds the first missing value of every numeric type.
pub fn sample(release: Release, order: ByteOrder) -> Dta {
    let mut d = Dta::new(release);
    d.order = order;
    d.vars = vec![
        var("id", Kind::Byte).labelled("yesno"),
        var("count", Kind::Int).described("Number of things"),
        var("when", Kind::Long).format("%td"),
        var("ratio", Kind::Float),
        var("amount", Kind::Double),
        var("name", Kind::Str(8)),
    ];
    d.rows = vec![
        vec![
            Cell::Int(1),
            Cell::Int(-300),
            Cell::Int(70000),
            Cell::Real(1.5),
            Cell::Real(2.25),
            Cell::Text(b"abc"),
        ],
        vec![
            Cell::Int(0),
            Cell::Int(32740),
            Cell::Int(-2147483647),
            Cell::Real(-0.5),
            Cell::Real(-3.0),
            Cell::Text(b"ab\0zz"),
        ],
        vec![
            Cell::Int(101),
            Cell::Int(32741),
            Cell::Int(2147483621),
            Cell::Real(2e38),
            Cell::Real(1e10),
            Cell::Text(b"12345678"),
        ],
    ];
    d.tables = vec![Table {
        name: "yesno",
        entries: vec![(0, "no"), (1, "yes")],
    }];
    d
}

pub fn sample_rows() -> Vec<Vec<String>> {
    [
        ["1", "-300", "70000", "1.5", "2.25", "abc"],
        ["0", "32740", "-2147483647", "-0.5", "-3.0", "ab"],
        [".", ".", ".", ".", "10000000000.0", "12345678"],
    ]
    .iter()
    .map(|r| r.iter().map(|s| s.to_string()).collect())
    .collect()
}

pub const ALL_RELEASES: [Release; 5] = [
    Release::V113,
    Release::V114,
    Release::V115,
    Release::V117,
    Release::V118,
];
