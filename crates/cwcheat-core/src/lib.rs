//! CWCheat bytecode engine.
//!
//! This crate turns a text cheat database into compiled instruction streams
//! and interprets them against guest memory on every scheduled tick. The
//! emulator owns memory, input, rumble and post-processing state and exposes
//! them through the traits in [`host`]; frontends drive the engine via the
//! [`runtime`] facade.

/// Compiled cheat codes and listing metadata.
pub mod code;

/// Instruction executor.
pub mod execute;

/// Cheat database engine: owns the parsed codes and runs them.
pub mod engine;

/// Cheat file location, creation and loading.
pub mod file;

/// Collaborator traits implemented by the emulator.
pub mod host;

/// Instruction decoder.
pub mod op;

/// Text cheat database parser.
pub mod parser;

/// Scheduler-facing lifecycle (start/stop/reload/tick).
pub mod runtime;

pub use code::{CheatCode, CheatDatabase, CheatInfo, CheatLine, CodeFormat};
pub use engine::CheatEngine;
pub use host::CheatHost;
pub use runtime::{CheatOptions, CheatRuntime};
