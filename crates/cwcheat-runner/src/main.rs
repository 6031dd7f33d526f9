mod config;
mod host;

use std::path::PathBuf;

use clap::Parser;
use cwcheat_core::file::read_cheat_file;
use cwcheat_core::parser::CheatFileParser;
use cwcheat_core::CheatRuntime;
use log::info;

use crate::host::RamHost;

#[derive(Parser)]
struct Args {
    /// Runner config file (defaults to the per-user config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding `<game id>.ini` cheat files
    #[arg(long)]
    cheats_dir: Option<PathBuf>,

    /// Disc ID of the game, e.g. ULUS-10014
    #[arg(long)]
    game_id: String,

    /// Raw memory image loaded at 0x08800000
    #[arg(long)]
    ram: Option<PathBuf>,

    /// Virtual milliseconds to run
    #[arg(long, default_value_t = 1000)]
    millis: u64,

    /// Held buttons as a hex mask, e.g. 0x4000 for Cross
    #[arg(long, value_parser = parse_hex)]
    buttons: Option<u32>,

    /// Pretend achievements hardcore mode is on
    #[arg(long)]
    hardcore: bool,

    /// List the cheats and parse errors in the game's file, then exit
    #[arg(long)]
    list: bool,

    /// Write user memory to this file after the run
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex mask {s:?}: {e}"))
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let mut cfg = config::load_from_file(&config_path);
    if let Some(dir) = &args.cheats_dir {
        cfg.cheats.cheats_dir = dir.clone();
    }
    if let Some(buttons) = args.buttons {
        cfg.host.buttons = buttons;
    }
    cfg.host.hardcore |= args.hardcore;

    if args.save_config {
        match config::save_to_file(&config_path, &cfg) {
            Ok(()) => info!("Saved config to {}", config_path.display()),
            Err(e) => eprintln!("Failed to save config {}: {e}", config_path.display()),
        }
    }

    let mut runtime = CheatRuntime::new(args.game_id.clone(), cfg.cheats.to_options());

    if args.list {
        list_cheats(&runtime, &args.game_id);
        return;
    }

    let mut host = RamHost::new(cfg.host.post_shaders.clone());
    host.buttons = cfg.host.buttons;
    host.hardcore = cfg.host.hardcore;

    if let Some(path) = &args.ram {
        match std::fs::read(path) {
            Ok(data) => host.load_user_image(&data),
            Err(e) => {
                eprintln!("Failed to load RAM image: {e}");
                return;
            }
        }
    }

    let (ticks, now) = run_for(&mut runtime, &mut host, args.millis);
    info!(
        "Ran {ticks} tick(s) over {now} ms, {} icache invalidation(s)",
        host.invalidations
    );
    runtime.shutdown();

    if let Some(path) = &args.dump {
        if let Err(e) = std::fs::write(path, host.user_ram()) {
            eprintln!("Failed to write memory dump: {e}");
        }
    }
}

/// Ticks `runtime` on a virtual clock until `millis` have passed. Returns the
/// tick count and the time of the last tick.
fn run_for(runtime: &mut CheatRuntime, host: &mut RamHost, millis: u64) -> (u64, u64) {
    let mut now = 0u64;
    let mut next_tick = runtime.init() as u64;
    let mut ticks = 0u64;
    while next_tick <= millis {
        now = next_tick;
        next_tick = now + runtime.tick(host).max(1) as u64;
        ticks += 1;
    }
    (ticks, now)
}

fn list_cheats(runtime: &CheatRuntime, game_id: &str) {
    let path = runtime.cheat_file_path();
    let text = match read_cheat_file(&path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    let output = CheatFileParser::new(game_id).parse(&text);
    println!("{}: {} cheat(s)", path.display(), output.info.len());
    for cheat in &output.info {
        let state = if cheat.enabled { "on " } else { "off" };
        println!("  [{state}] line {:>4}: {}", cheat.line_num, cheat.name);
    }
    for msg in output.error_messages() {
        println!("  {msg}");
    }
}
