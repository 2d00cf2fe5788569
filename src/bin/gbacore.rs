// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use serde::Serialize;

use gbacore::core::config::{Config, DEFAULT_CONFIG_FILE};
use gbacore::core::cpu::CpuState;
use gbacore::core::error::Result;
use gbacore::core::save_state::SaveState;
use gbacore::core::system::System;

/// Game Boy Advance (ARM7TDMI) emulator core
#[derive(Parser)]
#[command(name = "gbacore")]
#[command(about = "Game Boy Advance emulator core", long_about = None)]
struct Args {
    /// Path to the cartridge image (.gba)
    rom: PathBuf,

    /// BIOS image; without one, software interrupts run in the emulator
    #[arg(short, long)]
    bios: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Number of frames to run (overrides the configuration)
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(short, long)]
    log_level: Option<String>,

    /// Write a save state when the run finishes
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Restore a save state before running
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Do not open the host audio device
    #[arg(long)]
    no_audio: bool,
}

/// Final machine state printed after the run
#[derive(Serialize)]
struct RunSummary<'a> {
    title: &'a str,
    frames: u64,
    cycles: u64,
    unsupported: u64,
    cpu: CpuState,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(bios) = &args.bios {
        config.bios_path = Some(bios.clone());
        config.skip_bios = false;
    }
    if let Some(frames) = args.frames {
        config.frames = frames;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .init();

    info!("gbacore v{}", env!("CARGO_PKG_VERSION"));

    let frames = config.frames;
    let mut system = System::with_config(config)?;
    if let Err(e) = system.load_rom_file(&args.rom) {
        error!("Failed to load ROM {}: {}", args.rom.display(), e);
        return Err(e);
    }
    system.reset();

    if let Some(path) = &args.load_state {
        info!("Restoring state from {}", path.display());
        let state = SaveState::load_from_file(path)?;
        system.load_state(&state)?;
    }

    #[cfg(feature = "audio")]
    if !args.no_audio {
        system.start_audio();
    }
    #[cfg(not(feature = "audio"))]
    let _ = args.no_audio;

    info!("Starting emulation for {} frames...", frames);
    let log_interval = (frames / 10).max(1);
    for frame in 0..frames {
        if let Err(e) = system.run_frame() {
            error!("Error at PC=0x{:08X}: {}", system.pc(), e);
            error!("Frame: {}", frame);
            system.cpu().dump_registers();
            return Err(e);
        }
        if frame % log_interval == 0 && frame > 0 {
            info!(
                "Progress: {}/{} frames | PC: 0x{:08X} | Cycles: {}",
                frame,
                frames,
                system.pc(),
                system.cycles()
            );
        }
    }

    if let Some(path) = &args.save_state {
        system.save_state().save_to_file(path)?;
        info!("Save state written to {}", path.display());
    }

    system.cpu().dump_registers();
    let summary = RunSummary {
        title: system.header().map_or("", |h| h.title.as_str()),
        frames: system.frame_count(),
        cycles: system.cycles(),
        unsupported: system.bus().unsupported_count(),
        cpu: system.cpu().snapshot(),
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to encode summary: {}", e),
    }

    Ok(())
}
