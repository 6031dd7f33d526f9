use std::path::PathBuf;

use log::{debug, error, info, warn};

use crate::engine::CheatEngine;
use crate::execute::invalidate_icache;
use crate::file::{cheat_file_path, create_cheat_file};
use crate::host::CheatHost;

/// Tick interval while cheats are off; only used to notice them being
/// turned on.
const DISABLED_REFRESH_MS: u32 = 1000;
const JIT_HACK_REFRESH_MS: u32 = 2;
const MIN_REFRESH_MS: u32 = 1;

/// Per-game invalidations for titles whose code gets patched behind the
/// JIT's back (Tony Hawk's Underground 2, MTX Mototrax).
const JIT_INVALIDATION_RANGES: &[(&[&str], &[(u32, u32)])] = &[
    (&["ULUS10014"], &[(0x0886_5600, 72), (0x0886_5690, 4)]),
    (
        &["ULES00033", "ULES00034", "ULES00035"],
        &[(0x0886_55D8, 72), (0x0886_5668, 4)],
    ),
    (
        &["ULUS10138"],
        &[(0x0886_DCC0, 72), (0x0886_DC20, 4), (0x0886_DD40, 4)],
    ),
    (
        &["ULES00581"],
        &[(0x0886_E1D8, 72), (0x0886_E138, 4), (0x0886_E258, 4)],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheatOptions {
    pub enable_cheats: bool,
    pub refresh_interval_ms: u32,
    /// Compatibility flag: tick every 2 ms and invalidate known hot ranges.
    pub jit_invalidation_hack: bool,
    pub cheats_dir: PathBuf,
    /// Create `<game_id>.ini` on start when it doesn't exist yet.
    pub create_missing_file: bool,
}

impl Default for CheatOptions {
    fn default() -> Self {
        Self {
            enable_cheats: false,
            refresh_interval_ms: 77,
            jit_invalidation_hack: false,
            cheats_dir: PathBuf::from("cheats"),
            create_missing_file: true,
        }
    }
}

/// Cheat subsystem state for one running game.
///
/// The emulator calls [`CheatRuntime::tick`] from its scheduler on the CPU
/// thread and reschedules it after the returned number of milliseconds.
/// Reloads and option changes must happen on the same thread.
#[derive(Debug)]
pub struct CheatRuntime {
    game_id: String,
    options: CheatOptions,
    engine: Option<CheatEngine>,
    enabled: bool,
    reload_requested: bool,
}

impl CheatRuntime {
    pub fn new(game_id: impl Into<String>, options: CheatOptions) -> Self {
        Self {
            game_id: game_id.into(),
            options,
            engine: None,
            enabled: false,
            reload_requested: false,
        }
    }

    /// Starts the engine if cheats are enabled and returns the delay before
    /// the first tick.
    pub fn init(&mut self) -> u32 {
        if self.options.enable_cheats {
            self.start();
        }
        self.refresh_ms()
    }

    pub fn shutdown(&mut self) {
        self.stop();
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn options(&self) -> &CheatOptions {
        &self.options
    }

    /// New options take effect on the next tick.
    pub fn set_options(&mut self, options: CheatOptions) {
        self.options = options;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn engine(&self) -> Option<&CheatEngine> {
        self.engine.as_ref()
    }

    pub fn cheat_file_path(&self) -> PathBuf {
        cheat_file_path(&self.options.cheats_dir, &self.game_id)
    }

    pub fn start(&mut self) {
        self.stop();

        let mut engine = CheatEngine::new(self.game_id.clone());
        let path = self.cheat_file_path();
        if self.options.create_missing_file && !self.game_id.is_empty() {
            if let Err(e) = create_cheat_file(&path) {
                error!("{e}");
            }
        }
        if let Err(e) = engine.load_file(&path) {
            warn!("{e}");
        }

        info!("Cheats enabled for {}", self.game_id);
        self.engine = Some(engine);
        self.reload_requested = false;
        self.enabled = true;
    }

    pub fn stop(&mut self) {
        if self.engine.take().is_some() {
            info!("Cheats disabled for {}", self.game_id);
        }
        self.enabled = false;
    }

    /// Re-reads the cheat file on the next tick.
    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    pub fn refresh_ms(&self) -> u32 {
        if self.options.jit_invalidation_hack {
            JIT_HACK_REFRESH_MS
        } else if !self.enabled {
            DISABLED_REFRESH_MS
        } else {
            // A zero interval would reschedule the tick at the same instant.
            self.options.refresh_interval_ms.max(MIN_REFRESH_MS)
        }
    }

    /// Scheduler callback. Returns the delay in milliseconds until the next
    /// call.
    pub fn tick<H: CheatHost + ?Sized>(&mut self, host: &mut H) -> u32 {
        let should_be_enabled = self.options.enable_cheats && !host.hardcore_mode_active();
        if self.enabled != should_be_enabled {
            if should_be_enabled {
                self.start();
            } else {
                self.stop();
            }
        }

        let next = self.refresh_ms();

        if self.options.jit_invalidation_hack {
            self.apply_jit_invalidation_hack(host);
        }

        if !self.enabled {
            return next;
        }

        if self.reload_requested {
            self.reload_requested = false;
            let path = self.cheat_file_path();
            if let Some(engine) = self.engine.as_mut() {
                debug!("Reloading cheats from {}", path.display());
                if let Err(e) = engine.load_file(&path) {
                    warn!("{e}");
                }
            }
        }

        if let Some(engine) = &self.engine {
            engine.run(host);
        }
        next
    }

    /// True when codes would actually run on the next tick.
    pub fn cheats_in_effect<H: CheatHost + ?Sized>(&self, host: &H) -> bool {
        if !self.enabled || host.hardcore_mode_active() {
            return false;
        }
        self.engine.as_ref().is_some_and(CheatEngine::has_cheats)
    }

    fn apply_jit_invalidation_hack<H: CheatHost + ?Sized>(&self, host: &mut H) {
        let ranges = JIT_INVALIDATION_RANGES
            .iter()
            .find(|(ids, _)| ids.contains(&self.game_id.as_str()))
            .map(|(_, ranges)| *ranges)
            .unwrap_or_default();
        for &(addr, size) in ranges {
            invalidate_icache(host, addr, size);
        }
    }
}
