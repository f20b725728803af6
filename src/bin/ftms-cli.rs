//! Small command line harness: discover fitness machines, or connect to
//! one and stream its events.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ftms_client::FtmsScanner;

#[derive(Parser)]
#[command(name = "ftms-cli", about = "FTMS fitness machine client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan for fitness machines
    Discover {
        /// Scan duration in seconds
        #[arg(long, default_value_t = 10)]
        wait: u64,
    },
    /// Connect to a machine and print its event stream
    Listen {
        /// Bluetooth address of the machine
        address: String,

        /// Scan duration in seconds
        #[arg(long, default_value_t = 10)]
        wait: u64,

        /// Control operation timeout in seconds
        #[arg(long, default_value_t = 2)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let scanner = FtmsScanner::new().await?;

    match cli.command {
        Command::Discover { wait } => {
            let machines = scanner.discover(Duration::from_secs(wait)).await?;

            if machines.is_empty() {
                println!("No fitness machines found");
            }

            for machine in machines {
                println!(
                    "{}  {:?}  name={}  rssi={}",
                    machine.address(),
                    machine.machine_type,
                    machine.local_name.as_deref().unwrap_or("?"),
                    machine
                        .rssi
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "?".into()),
                );
            }
        }
        Command::Listen {
            address,
            wait,
            timeout,
        } => {
            let discovered = scanner
                .find_by_address(&address, Duration::from_secs(wait))
                .await
                .context("machine not found during scan")?;

            let mut machine = discovered.into_machine()?;

            machine.set_timeout(Duration::from_secs(timeout));
            machine.on_event(|event| println!("[{}] {:?}", event.id(), event));

            machine.connect().await.context("connect failed")?;

            println!("Device info: {:?}", machine.device_info());
            println!("Machine features: {:?}", machine.machine_features());
            println!("Supported settings: {:?}", machine.supported_settings());
            println!("Setting ranges: {:?}", machine.supported_ranges());
            println!("Listening, Ctrl-C to exit");

            tokio::signal::ctrl_c().await?;

            machine.disconnect().await?;
        }
    }

    Ok(())
}
