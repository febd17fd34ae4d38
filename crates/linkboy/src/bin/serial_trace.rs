use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use typed_builder::TypedBuilder;

use linkboy::{LinkMachine, CPU_CLOCK_HZ, TCYCLES_PER_MCYCLE};

/// Drive the serial port with no cable attached and report when each
/// transfer-complete interrupt fires.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Maximum steps to wait for each transfer.
    #[arg(long, default_value_t = 4096)]
    steps: u64,
    /// T-cycles per step.
    #[arg(long, default_value_t = TCYCLES_PER_MCYCLE)]
    step_cycles: u32,
    /// Number of transfers to start back to back.
    #[arg(long, default_value_t = 1)]
    transfers: u32,
    /// Write a snapshot here when done.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Resume from this snapshot.
    #[arg(long)]
    load: Option<PathBuf>,
}

#[derive(TypedBuilder, Debug)]
struct TraceConfig {
    #[builder(default = 4096)]
    max_steps: u64,
    #[builder(default = TCYCLES_PER_MCYCLE)]
    step_cycles: u32,
    #[builder(default = 1)]
    transfers: u32,
    #[builder(default)]
    save_path: Option<PathBuf>,
    #[builder(default)]
    load_path: Option<PathBuf>,
}

impl From<Args> for TraceConfig {
    fn from(args: Args) -> Self {
        TraceConfig::builder()
            .max_steps(args.steps)
            .step_cycles(args.step_cycles)
            .transfers(args.transfers)
            .save_path(args.save)
            .load_path(args.load)
            .build()
    }
}

fn load(machine: &mut LinkMachine, path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    machine
        .load_state(&mut BufReader::new(file))
        .with_context(|| format!("loading snapshot '{}'", path.display()))?;
    Ok(())
}

fn save(machine: &LinkMachine, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating '{}'", path.display()))?;
    let mut out = BufWriter::new(file);
    machine
        .save_state(&mut out)
        .with_context(|| format!("writing snapshot '{}'", path.display()))?;
    out.flush()?;
    Ok(())
}

fn run(config: TraceConfig) -> Result<()> {
    if config.step_cycles == 0 {
        bail!("--step-cycles must be at least 1");
    }

    let mut machine = LinkMachine::new();
    if let Some(path) = &config.load_path {
        load(&mut machine, path)?;
    }

    for transfer in 1..=config.transfers {
        // Resuming mid-transfer: let the in-flight one finish first.
        if !machine.serial.is_transferring() {
            machine.write8(0xFF02, 0x81);
        }
        let started = machine.cycles();
        let Some(steps) = machine.run_until_serial_interrupt(config.step_cycles, config.max_steps)
        else {
            bail!(
                "transfer {transfer} did not complete within {} steps",
                config.max_steps
            );
        };
        log::info!(
            "transfer {transfer}: interrupt at cycle {} after {} cycles ({steps} steps), SB=0x{:02X}",
            machine.cycles(),
            machine.cycles() - started,
            machine.read8(0xFF01)
        );
        machine.write8(0xFF0F, 0x00);
    }

    println!(
        "{} transfer(s) finished at cycle {} ({:.6} s emulated)",
        config.transfers,
        machine.cycles(),
        machine.cycles() as f64 / CPU_CLOCK_HZ as f64
    );

    if let Some(path) = &config.save_path {
        save(&machine, path)?;
        println!("Wrote snapshot to '{}'", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    run(Args::parse().into())
}
