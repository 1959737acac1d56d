// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

use sysoff_config::{
    load_cycle_script, BoardProfile, CorruptSpec, CycleScript, CycleStep, WakeSource,
    WakeupStrategy,
};
use sysoff_core::device::{Device, StepOutcome};
use sysoff_core::snapshot::DeviceSnapshot;

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

fn parse_u64(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value '{}': {}", s, e))
    } else {
        u64::from_str(trimmed).map_err(|e| format!("Invalid value '{}': {}", s, e))
    }
}

/// `press:SW1`, `timer`, `idle`, `corrupt:OFFSET[:XOR]`, `power_loss`.
fn parse_step(s: &str) -> Result<CycleStep, String> {
    let mut parts = s.trim().split(':');
    let action = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    let step = match (action.as_str(), args.as_slice()) {
        ("press", [switch]) => CycleStep::Press {
            switch: WakeSource::from_str(switch)?,
        },
        ("timer", []) => CycleStep::Timer,
        ("idle", []) => CycleStep::Idle,
        ("power_loss" | "power-loss", []) => CycleStep::PowerLoss,
        ("corrupt", [offset]) | ("corrupt", [offset, _]) => {
            let offset = parse_u64(offset)? as usize;
            let xor = match args.get(1) {
                Some(x) => u8::try_from(parse_u64(x)?)
                    .map_err(|_| format!("XOR mask '{}' does not fit in a byte", x))?,
                None => 0xFF,
            };
            CycleStep::Corrupt(CorruptSpec { offset, xor })
        }
        _ => {
            return Err(format!(
                "Invalid step '{}'. Expected press:SWx, timer, idle, corrupt:OFFSET[:XOR] or power_loss",
                s
            ))
        }
    };
    Ok(step)
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "System-off retention demo, simulated over power cycles",
    long_about = None
)]
struct Cli {
    /// Board profile (YAML). Defaults to the built-in nRF54L15-DK wiring.
    #[arg(short, long)]
    board: Option<PathBuf>,

    /// Power-cycle script (YAML) with steps and expectations.
    #[arg(short = 'c', long)]
    script: Option<PathBuf>,

    /// Press a switch while the device is off (repeatable).
    #[arg(long, conflicts_with = "step")]
    press: Vec<WakeSource>,

    /// Apply a step after power-on (repeatable), e.g. press:SW1, timer, corrupt:8:0x01.
    #[arg(long, value_parser = parse_step)]
    step: Vec<CycleStep>,

    /// Wake on the GRTC after SECONDS instead of on the switches.
    #[arg(long, value_name = "SECONDS", num_args = 0..=1, default_missing_value = "2")]
    timer: Option<u32>,

    /// Print a JSON result with a device snapshot instead of the console.
    #[arg(long)]
    json: bool,

    /// Write the final device snapshot (JSON) to a file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable register-level tracing
    #[arg(short, long)]
    trace: bool,
}

#[derive(Debug, Serialize)]
struct RunResult {
    result_schema_version: String,
    status: String,
    boots_observed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<String>,
    device: DeviceSnapshot,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Console output owns stdout, logs go to stderr.
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    run(cli)
}

fn load_profile(cli: &Cli, script: Option<(&Path, &CycleScript)>) -> anyhow::Result<BoardProfile> {
    let script_board = script.and_then(|(path, s)| {
        s.board.as_ref().map(|board| {
            path.parent()
                .unwrap_or_else(|| Path::new("."))
                .join(board)
        })
    });

    let mut profile = match cli.board.clone().or(script_board) {
        Some(path) => {
            info!("Loading board profile: {:?}", path);
            BoardProfile::from_file(&path)?
        }
        None => BoardProfile::nrf54l15dk(),
    };

    if let Some(seconds) = cli.timer {
        profile.wakeup = WakeupStrategy::Timer { seconds };
    }
    profile
        .validate()
        .context("Board profile failed validation")?;
    Ok(profile)
}

fn print_console(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn run(cli: Cli) -> ExitCode {
    let script = match &cli.script {
        Some(path) => match load_cycle_script(path) {
            Ok(script) => Some((path.clone(), script)),
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        },
        None => None,
    };

    let profile = match load_profile(&cli, script.as_ref().map(|(p, s)| (p.as_path(), s))) {
        Ok(profile) => profile,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut steps: Vec<CycleStep> = script
        .as_ref()
        .map(|(_, s)| s.steps.clone())
        .unwrap_or_default();
    steps.extend(cli.press.iter().map(|&switch| CycleStep::Press { switch }));
    steps.extend(cli.step.iter().copied());

    let mut device = match Device::new(profile) {
        Ok(device) => device,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!("Powering on {}", device.profile().name);
    let first = device.power_on();
    if !cli.json {
        print_console(&first.console);
    }

    for step in &steps {
        match device.apply(step) {
            Ok(StepOutcome::Booted(report)) => {
                if !cli.json {
                    print_console(&report.console);
                }
            }
            Ok(StepOutcome::StayedOff) => info!("{:?}: device stayed off", step),
            Ok(StepOutcome::Corrupted { offset, xor }) => {
                info!("Retained byte {} xor {:#04x}", offset, xor)
            }
            Ok(StepOutcome::Ignored) => info!("{:?}: ignored", step),
            Err(e) => {
                error!("Step {:?} failed: {}", step, e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    let failures = script
        .as_ref()
        .and_then(|(_, s)| s.expect.as_ref())
        .map(|expect| device.check_expectations(expect))
        .unwrap_or_default();
    for failure in &failures {
        error!("Expectation failed: {}", failure);
    }

    let snapshot = device.snapshot();
    if let Some(path) = &cli.snapshot {
        if let Err(e) = write_snapshot(path, &snapshot) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    if cli.json {
        let result = RunResult {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status: (if failures.is_empty() { "pass" } else { "fail" }).to_string(),
            boots_observed: device.history().len(),
            failures: failures.clone(),
            device: snapshot,
        };
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize result: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    if failures.is_empty() {
        ExitCode::from(EXIT_PASS)
    } else {
        ExitCode::from(EXIT_ASSERT_FAIL)
    }
}

fn write_snapshot(path: &Path, snapshot: &DeviceSnapshot) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot to {:?}", path))?;
    info!("Snapshot written to {:?}", path);
    Ok(())
}
