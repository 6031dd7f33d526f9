use std::path::Path;

use log::{info, warn};

use crate::code::{CheatDatabase, CheatInfo};
use crate::execute::execute;
use crate::file::{CheatFileError, read_cheat_file};
use crate::host::CheatHost;
use crate::op::decode_next;
use crate::parser::{CheatFileParser, ParseOutput};

/// Owns the compiled cheat database for one game and runs it.
#[derive(Debug, Clone, Default)]
pub struct CheatEngine {
    game_id: String,
    database: CheatDatabase,
}

impl CheatEngine {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            database: CheatDatabase::default(),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn database(&self) -> &CheatDatabase {
        &self.database
    }

    pub fn has_cheats(&self) -> bool {
        !self.database.is_empty()
    }

    /// Replaces the database with the codes parsed from `text`.
    pub fn parse_cheats(&mut self, text: &str) -> ParseOutput {
        let output = CheatFileParser::new(&self.game_id).parse(text);
        for err in &output.errors {
            warn!("cheats: {err}");
        }
        info!(
            "Loaded {} cheat code(s) for {}",
            output.database.len(),
            self.game_id
        );
        self.database = output.database.clone();
        output
    }

    /// Loads and parses a cheat file, replacing the database. The database is
    /// left untouched when the file can't be read.
    pub fn load_file(&mut self, path: &Path) -> Result<ParseOutput, CheatFileError> {
        let text = read_cheat_file(path)?;
        let mut output = self.parse_cheats(&text);
        output.database.source = Some(path.to_path_buf());
        self.database.source = Some(path.to_path_buf());
        Ok(output)
    }

    /// Listing metadata for `text`, without touching the loaded codes.
    pub fn file_info(&self, text: &str) -> Vec<CheatInfo> {
        CheatFileParser::new(&self.game_id).parse(text).info
    }

    /// Runs every code once, each to completion or until it aborts.
    pub fn run<H: CheatHost + ?Sized>(&self, host: &mut H) {
        if host.hardcore_mode_active() {
            return;
        }

        for code in &self.database.codes {
            let mut i = 0;
            while i < code.lines.len() {
                let op = decode_next(code, &mut i);
                execute(op, code, &mut i, host);
            }
        }
    }
}
