use log::debug;
use thiserror::Error;

use crate::code::{CheatCode, CheatDatabase, CheatInfo, CheatLine, CodeFormat};

const UTF8_BOM: char = '\u{FEFF}';

/// A problem found on one line of a cheat file. Parsing always continues past
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unrecognized content on line {line}: expecting _")]
    Unrecognized { line: usize },
    #[error("Error on line {line}: could not parse cheat name line")]
    BadCheatName { line: usize },
    #[error("Error on line {line}: unknown line type")]
    UnknownLineType { line: usize },
    #[error("Error on line {line}: mixed code format (cwcheat/tempar)")]
    MixedFormat { line: usize },
    #[error("Error on line {line}: expecting two values")]
    ExpectingTwoValues { line: usize },
    #[error("Error on line {line}: junk after line data")]
    TrailingJunk { line: usize },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match *self {
            ParseError::Unrecognized { line }
            | ParseError::BadCheatName { line }
            | ParseError::UnknownLineType { line }
            | ParseError::MixedFormat { line }
            | ParseError::ExpectingTwoValues { line }
            | ParseError::TrailingJunk { line } => line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOutput {
    pub database: CheatDatabase,
    pub info: Vec<CheatInfo>,
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors rendered for display, one per offending line.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Single-use parser for the `_S/_G/_C/_L/_M` cheat database format.
pub struct CheatFileParser {
    valid_game_id: String,

    line: usize,
    games: usize,
    errors: Vec<ParseError>,
    info: Vec<CheatInfo>,
    codes: Vec<CheatCode>,
    pending: Vec<CheatLine>,
    format: CodeFormat,
    last_info: Option<CheatInfo>,
    game_enabled: bool,
    game_risky_enabled: bool,
    cheat_enabled: bool,
}

impl CheatFileParser {
    /// `game_id` is the running game's disc ID; dashes are ignored. An empty
    /// ID accepts every `_S` section.
    pub fn new(game_id: &str) -> Self {
        Self {
            valid_game_id: game_id.replace('-', ""),
            line: 0,
            games: 0,
            errors: Vec::new(),
            info: Vec::new(),
            codes: Vec::new(),
            pending: Vec::new(),
            format: CodeFormat::Undefined,
            last_info: None,
            game_enabled: true,
            game_risky_enabled: false,
            cheat_enabled: false,
        }
    }

    pub fn parse(mut self, text: &str) -> ParseOutput {
        for (idx, raw) in text.lines().enumerate() {
            self.line = idx + 1;

            let raw = if idx == 0 {
                raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
            } else {
                raw
            };
            let line = trim(raw);

            // "_G N" / "_C0 N" are the shortest meaningful directives.
            if line.len() >= 5 && line.starts_with('_') {
                self.parse_line(line);
            } else if line.starts_with("//") || line.starts_with('#') {
                // Comment.
            } else if !line.is_empty() {
                self.errors.push(ParseError::Unrecognized { line: self.line });
            }
        }

        self.flush();

        ParseOutput {
            database: CheatDatabase {
                source: None,
                codes: self.codes,
            },
            info: self.info,
            errors: self.errors,
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.flush_cheat_info();
            let lines = std::mem::take(&mut self.pending);
            self.codes.push(CheatCode::new(self.format, lines));
        }
        self.format = CodeFormat::Undefined;
    }

    fn flush_cheat_info(&mut self) {
        if let Some(info) = self.last_info.take() {
            self.info.push(info);
        }
    }

    fn parse_line(&mut self, line: &str) {
        match line.as_bytes()[1] {
            b'S' => {
                self.flush();
                self.games += 1;

                if self.validate_game_id(&line[2..]) {
                    if self.game_risky_enabled {
                        // Found the real section, drop what the lenient
                        // fallback picked up.
                        self.discard_risky();
                    }
                    self.game_enabled = true;
                } else if self.games == 1 {
                    // Legacy files carry a single section; accept it even when
                    // the ID doesn't match.
                    debug!(
                        "cheat section {} does not match {}, accepting it anyway",
                        trim(&line[2..]),
                        self.valid_game_id
                    );
                    self.game_risky_enabled = true;
                    self.game_enabled = true;
                } else {
                    if self.game_risky_enabled {
                        self.discard_risky();
                    }
                    self.game_enabled = false;
                }
            }
            b'G' => {}
            b'C' => {
                self.flush();

                let name: String = line.chars().skip(4).collect();
                match line.as_bytes().get(2) {
                    Some(b'1'..=b'9') => {
                        self.last_info = Some(CheatInfo {
                            line_num: self.line,
                            name,
                            enabled: true,
                        });
                        self.cheat_enabled = true;
                    }
                    Some(b'0') => {
                        self.last_info = Some(CheatInfo {
                            line_num: self.line,
                            name,
                            enabled: false,
                        });
                        self.cheat_enabled = false;
                    }
                    _ => {
                        self.errors.push(ParseError::BadCheatName { line: self.line });
                        self.cheat_enabled = false;
                    }
                }
            }
            b'L' => self.parse_data_line(&line[2..], CodeFormat::CwCheat),
            b'M' => self.parse_data_line(&line[2..], CodeFormat::TempAr),
            _ => self
                .errors
                .push(ParseError::UnknownLineType { line: self.line }),
        }
    }

    fn discard_risky(&mut self) {
        self.codes.clear();
        self.info.clear();
        self.game_risky_enabled = false;
    }

    fn parse_data_line(&mut self, data: &str, format: CodeFormat) {
        if self.format == CodeFormat::Undefined {
            self.format = format;
        } else if self.format != format {
            self.errors.push(ParseError::MixedFormat { line: self.line });
            self.last_info = None;
            self.pending.clear();
            self.cheat_enabled = false;
        }

        if !self.game_enabled {
            return;
        }
        if !self.cheat_enabled {
            // Disabled entries are listed but contribute no records.
            self.flush_cheat_info();
            return;
        }

        let Some((part1, rest)) = scan_hex(data) else {
            self.errors
                .push(ParseError::ExpectingTwoValues { line: self.line });
            return;
        };
        let Some((part2, rest)) = scan_hex(rest) else {
            self.errors
                .push(ParseError::ExpectingTwoValues { line: self.line });
            return;
        };

        if !trim(rest).is_empty() {
            self.errors.push(ParseError::TrailingJunk { line: self.line });
        }
        self.pending.push(CheatLine::new(part1, part2));
    }

    fn validate_game_id(&self, game_id: &str) -> bool {
        self.valid_game_id.is_empty() || trim(game_id).replace('-', "") == self.valid_game_id
    }
}

fn is_space(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\x0B'
}

fn trim(s: &str) -> &str {
    s.trim_matches(is_space)
}

/// Reads one `%x` value: optional whitespace, optional sign, optional `0x`,
/// hex digits. Values wider than 32 bits keep their low word; a `-` negates
/// modulo 2^32.
fn scan_hex(s: &str) -> Option<(u32, &str)> {
    let s = s.trim_start_matches(is_space);
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .filter(|d| d.starts_with(|c: char| c.is_ascii_hexdigit()))
        .unwrap_or(s);
    let end = digits
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let value = digits[..end].chars().fold(0u32, |acc, c| {
        // is_ascii_hexdigit() above guarantees a digit.
        (acc << 4) | c.to_digit(16).unwrap_or(0)
    });
    let value = if negative { value.wrapping_neg() } else { value };
    Some((value, &digits[end..]))
}
