use anyhow::{Context, Result};
use clap::Parser;
use clap_num::maybe_hex;
use rtlboot_cli::args::{ConnectionArgs, DecodeArg};
use rtlboot_cli::logging::setup_logging;
use rtlboot_lib::constants::{DEFAULT_DUMP_SIZE, DEFAULT_STEP, FLASH_BASE};
use rtlboot_lib::{BootSession, DumpPlan, dump_flash};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, info};

/// RTL Flash Dumper: read flash out of the Realtek boot monitor... very slowly!
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,
    /// Path to file to save dump into
    #[arg(short, long)]
    output_file: PathBuf,
    /// Start address (hex with 0x prefix, or decimal)
    #[arg(short, long, value_parser = maybe_hex::<u32>, default_value_t = FLASH_BASE)]
    start_addr: u32,
    /// End address, exclusive [default: start + 16 MiB]
    #[arg(short, long, value_parser = maybe_hex::<u32>)]
    end_addr: Option<u32>,
    /// Bytes per FLR/DW round, must be a multiple of 4
    #[arg(long, value_parser = maybe_hex::<u32>, default_value_t = DEFAULT_STEP)]
    step: u32,
    /// Handling of undecodable bytes in the dump output
    #[arg(long, value_enum, default_value_t = DecodeArg::Lossy)]
    decode: DecodeArg,
}

impl Cli {
    fn end_addr(&self) -> u32 {
        self.end_addr
            .unwrap_or_else(|| self.start_addr.saturating_add(DEFAULT_DUMP_SIZE))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let guard = setup_logging(cli.conn.log_file.clone(), &cli.conn.verbose)?;

    let result = run(cli);
    if let Err(e) = &result {
        error!("Dump failed: {:?}", e);
    }
    // Flush the log file before exiting
    drop(guard);
    if result.is_err() {
        process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let end_addr = cli.end_addr();
    // Validate before touching the port or the output file
    let plan = DumpPlan::new(cli.start_addr, end_addr, cli.step).context("Invalid dump parameters")?;
    let profile = cli.conn.load_profile()?;

    let file = File::create(&cli.output_file)
        .with_context(|| format!("Failed to create output file at: {:?}", cli.output_file))?;
    let mut out = BufWriter::new(file);

    let mut session = BootSession::open(&cli.conn.serial_port, profile, cli.conn.session_config())
        .with_context(|| format!("Failed to open serial port {}", cli.conn.serial_port))?;
    session.sync_prompt().context("Boot monitor did not answer")?;

    let written = dump_flash(&mut session, &plan, &mut out, cli.decode.into(), |p| {
        debug!(
            address = format!("{:#x}", p.address),
            written = p.bytes_written,
            total = p.total_bytes,
            "Round complete"
        );
    })
    .with_context(|| format!("Dump aborted, partial output left in {:?}", cli.output_file))?;

    info!("Wrote {} bytes to {:?}", written, cli.output_file);
    Ok(())
}
