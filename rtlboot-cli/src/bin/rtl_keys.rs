use anyhow::{Context, Result};
use clap::Parser;
use rtlboot_cli::args::ConnectionArgs;
use rtlboot_cli::logging::setup_logging;
use rtlboot_lib::{BootSession, recover_keys};
use rtlboot_lib::command::Command;
use std::process;
use tracing::error;

/// Automate KEK and AUSKEY retrieval from the LIDL Zigbee gateway.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let guard = setup_logging(cli.conn.log_file.clone(), &cli.conn.verbose)?;

    let result = run(cli);
    if let Err(e) = &result {
        error!("Key recovery failed: {:?}", e);
    }
    drop(guard);
    if result.is_err() {
        process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let profile = cli.conn.load_profile()?;
    let mut session = BootSession::open(&cli.conn.serial_port, profile, cli.conn.session_config())
        .with_context(|| format!("Failed to open serial port {}", cli.conn.serial_port))?;

    let keys = recover_keys(&mut session).context("Key recovery failed")?;

    let profile = session.profile();
    let [first, second] = profile.auskey;
    let kek_cmd = Command::flash_read(profile, profile.kek.address, profile.kek.length);
    let auskey_cmd = Command::flash_read(profile, first.address, first.length + second.length);
    println!("> {kek_cmd}\n< {}", keys.kek_hex);
    println!("> {auskey_cmd}\n< {}", keys.auskey_hex);

    println!("KEK: {}", hex::encode(keys.kek));
    println!("AUSKEY: {}", keys.auskey);
    println!("Root password: {}", keys.root_password);
    Ok(())
}
