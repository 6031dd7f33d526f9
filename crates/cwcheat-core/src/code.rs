use std::path::PathBuf;

/// Which cheat device syntax a code was written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CodeFormat {
    #[default]
    Undefined,
    /// `_L` lines.
    CwCheat,
    /// `_M` lines (Action Replay / TempAR).
    TempAr,
}

/// One 64-bit record of a compiled code: the two hex words of a data line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CheatLine {
    pub part1: u32,
    pub part2: u32,
}

impl CheatLine {
    pub const fn new(part1: u32, part2: u32) -> Self {
        Self { part1, part2 }
    }
}

/// A compiled cheat: the ordered instruction stream of one `_C` entry.
///
/// The format is fixed by the first data line; codes mixing `_L` and `_M`
/// lines never reach the database.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CheatCode {
    pub format: CodeFormat,
    pub lines: Vec<CheatLine>,
}

impl CheatCode {
    pub fn new(format: CodeFormat, lines: Vec<CheatLine>) -> Self {
        Self { format, lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Listing metadata for a `_C` entry. Not used when running codes.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CheatInfo {
    /// 1-based line of the `_C` directive.
    pub line_num: usize,
    pub name: String,
    pub enabled: bool,
}

/// All executable codes parsed from one cheat file.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CheatDatabase {
    pub source: Option<PathBuf>,
    pub codes: Vec<CheatCode>,
}

impl CheatDatabase {
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }
}
