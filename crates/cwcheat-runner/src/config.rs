use cwcheat_core::CheatOptions;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheatsConfig {
    pub enable: bool,
    pub refresh_interval_ms: u32,
    pub jit_invalidation_hack: bool,
    pub cheats_dir: PathBuf,
    pub create_missing_file: bool,
}

impl Default for CheatsConfig {
    fn default() -> Self {
        let options = CheatOptions::default();
        Self {
            // The runner exists to run cheats.
            enable: true,
            refresh_interval_ms: options.refresh_interval_ms,
            jit_invalidation_hack: options.jit_invalidation_hack,
            cheats_dir: options.cheats_dir,
            create_missing_file: options.create_missing_file,
        }
    }
}

impl CheatsConfig {
    pub fn to_options(&self) -> CheatOptions {
        CheatOptions {
            enable_cheats: self.enable,
            refresh_interval_ms: self.refresh_interval_ms.max(1),
            jit_invalidation_hack: self.jit_invalidation_hack,
            cheats_dir: self.cheats_dir.clone(),
            create_missing_file: self.create_missing_file,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Section names of the active post-processing chain, in order.
    pub post_shaders: Vec<String>,
    pub buttons: u32,
    pub hardcore: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunnerConfig {
    pub cheats: CheatsConfig,
    pub host: HostConfig,
}

/// Environment override for the config location.
pub const CONFIG_ENV: &str = "CWCHEAT_RUNNER_CONFIG";

/// `$CWCHEAT_RUNNER_CONFIG`, else `runner.toml` under the platform config
/// directory, else the working directory.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    let config_dir = if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    };

    match config_dir {
        Some(dir) => dir.join("cwcheat").join("runner.toml"),
        None => PathBuf::from("runner.toml"),
    }
}

/// Loads the runner config, falling back to defaults. Only unreadable or
/// malformed files are reported; a missing one is not.
pub fn load_from_file(path: &Path) -> RunnerConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No runner config at {}, using defaults", path.display());
            return RunnerConfig::default();
        }
        Err(e) => {
            warn!("Cannot read runner config {}: {e}", path.display());
            return RunnerConfig::default();
        }
    };

    toml::from_str(&text).unwrap_or_else(|e| {
        warn!(
            "Ignoring runner config {}, it is not valid TOML: {e}",
            path.display()
        );
        RunnerConfig::default()
    })
}

pub fn save_to_file(path: &Path, cfg: &RunnerConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(cfg).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}
