//! rtdump - inspect a partition resource table blob.

use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use resource_table::{ResourceTable, ResourceTableError};

#[derive(Parser)]
#[command(name = "rtdump", version, about = "Inspect a partition resource table blob")]
struct Cli {
    /// Path to the blob file
    blob: PathBuf,

    /// Emit a single JSON document instead of text
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("rtdump: {:#}", err);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let table = ResourceTable::open(&cli.blob)
        .with_context(|| format!("failed to load {}", cli.blob.display()))?;

    if cli.json {
        print_json(&table)
    } else {
        print_text(&table)
    }
}

fn print_text(table: &ResourceTable) -> Result<()> {
    println!("{}", table.header());
    println!();
    print!("{}", table.dump());
    println!();

    println!("cell name: {}", table.cell_name().unwrap_or("<none>"));
    println!("cpu name:  {}", table.cpu_name().unwrap_or("<none>"));

    let reservations = table.reservations()?;
    for (i, entry) in reservations.iter().enumerate() {
        println!(
            "reserve {}: address {:#x} size {:#x}",
            i, entry.address, entry.size
        );
    }

    for i in 0..memory_count(table)? {
        let region = table.memory_at(i)?;
        println!(
            "memory {}: phys {:#x} virt {:#x} size {:#x}",
            i, region.phys, region.virt, region.size
        );
    }

    for i in 0..device_count(table)? {
        println!("device {}: {}", i, table.device_name(i).unwrap_or("<unnamed>"));
    }

    Ok(())
}

/// Memory region count, treating an absent `/memorys` node as empty.
fn memory_count(table: &ResourceTable) -> Result<usize> {
    match table.memory_count() {
        Ok(count) => Ok(count),
        Err(ResourceTableError::PathNotFound(_)) => Ok(0),
        Err(err) => Err(err).context("memory region enumeration failed"),
    }
}

/// Device count, treating an absent `/devices` node as empty.
fn device_count(table: &ResourceTable) -> Result<usize> {
    match table.device_count() {
        Ok(count) => Ok(count),
        Err(ResourceTableError::PathNotFound(_)) => Ok(0),
        Err(err) => Err(err).context("device enumeration failed"),
    }
}

fn print_json(table: &ResourceTable) -> Result<()> {
    let mut memories = Vec::new();
    for i in 0..memory_count(table)? {
        memories.push(table.memory_at(i)?);
    }

    let mut devices = Vec::new();
    for i in 0..device_count(table)? {
        devices.push(table.device_name(i).unwrap_or("").to_string());
    }

    let doc = serde_json::json!({
        "header": table.header(),
        "cell_name": table.cell_name(),
        "cpu_name": table.cpu_name(),
        "reservations": table.reservations()?,
        "memories": memories,
        "devices": devices,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);

    Ok(())
}
