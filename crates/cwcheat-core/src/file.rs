use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Written into freshly created cheat files so editors keep them UTF-8.
const NEW_FILE_CONTENTS: &[u8] = b"\xEF\xBB\xBF\n";

#[derive(Debug, Error)]
pub enum CheatFileError {
    #[error("failed to create cheat directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to create cheat file {}, disk may be full", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },
    #[error("failed to read cheat file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `<dir>/<game_id>.ini`.
pub fn cheat_file_path(dir: &Path, game_id: &str) -> PathBuf {
    dir.join(format!("{game_id}.ini"))
}

/// Creates an empty cheat file (just a BOM) unless one already exists.
pub fn create_cheat_file(path: &Path) -> Result<(), CheatFileError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| CheatFileError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    if path.exists() {
        return Ok(());
    }

    let written = fs::write(path, NEW_FILE_CONTENTS);
    if !path.exists() {
        return Err(CheatFileError::Create {
            path: path.to_path_buf(),
            source: written.err(),
        });
    }
    Ok(())
}

/// Reads a cheat file. Invalid UTF-8 is replaced rather than rejected.
pub fn read_cheat_file(path: &Path) -> Result<String, CheatFileError> {
    let bytes = fs::read(path).map_err(|source| CheatFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
