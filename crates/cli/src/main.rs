use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use keyfob_device::{Curve, DerivationPath, KeySlot, Session};
use keyfob_transport_hid::{DeviceManager, HidConfig, HidTransport};
use tracing::info;

mod commands;

use commands::*;

#[derive(Parser)]
#[command(version, about = "CLI for the keyfob hardware signing device")]
struct Cli {
    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for a device response (covers on-device approval)
    #[arg(long, default_value_t = 45)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Which key slot a command operates on
#[derive(Args)]
#[group(required = true, multiple = false)]
struct SlotArgs {
    /// Key derivation path (e.g. m/44'/118'/0'/0/0)
    #[arg(long)]
    path: Option<String>,

    /// Use the fixed test key (test firmware only)
    #[arg(long)]
    test_key: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CurveArg {
    Secp256k1,
    Ed25519,
}

impl From<CurveArg> for Curve {
    fn from(curve: CurveArg) -> Self {
        match curve {
            CurveArg::Secp256k1 => Self::Secp256k1,
            CurveArg::Ed25519 => Self::Ed25519,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List visible HID devices
    List,

    /// Show the firmware version and identity
    Version,

    /// Echo bytes off the device (test firmware only)
    Echo {
        /// Message to echo
        #[arg(required = true)]
        message: String,
    },

    /// Hash data on the device with SHA-256 (test firmware only)
    Hash {
        /// Data to hash, as a hex string
        #[arg(required = true)]
        data: String,
    },

    /// Retrieve the public key of a key slot
    PublicKey {
        /// Signature scheme
        #[arg(long, value_enum, default_value_t = CurveArg::Secp256k1)]
        curve: CurveArg,

        #[command(flatten)]
        slot: SlotArgs,
    },

    /// Sign data with a key slot (requires approval on the device)
    Sign {
        /// Data to sign, as a hex string
        #[arg(required = true)]
        data: String,

        /// Signature scheme
        #[arg(long, value_enum, default_value_t = CurveArg::Secp256k1)]
        curve: CurveArg,

        #[command(flatten)]
        slot: SlotArgs,

        /// Skip host-side verification of the returned signature
        #[arg(long)]
        no_verify: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let manager = DeviceManager::new()?;

    // Listing is the only command that needs no open transport; everything
    // else connects to the first compatible device here.
    let connect = || -> Result<Session<HidTransport>, Box<dyn std::error::Error>> {
        let config = HidConfig::default().with_read_timeout(Duration::from_secs(cli.timeout));
        let transport = find_device(&manager, config)?;
        info!("Using device: {}", transport.path());
        Ok(Session::new(transport).with_logging(cli.verbose))
    };

    match &cli.command {
        Commands::List => list_devices(&manager),
        Commands::Version => version_command(&mut connect()?)?,
        Commands::Echo { message } => echo_command(&mut connect()?, message)?,
        Commands::Hash { data } => hash_command(&mut connect()?, data)?,
        Commands::PublicKey { curve, slot } => {
            public_key_command(&mut connect()?, (*curve).into(), &parse_slot(slot)?)?
        }
        Commands::Sign {
            data,
            curve,
            slot,
            no_verify,
        } => sign_command(
            &mut connect()?,
            data,
            (*curve).into(),
            &parse_slot(slot)?,
            *no_verify,
        )?,
    }

    Ok(())
}

fn parse_slot(slot: &SlotArgs) -> Result<KeySlot, Box<dyn std::error::Error>> {
    match &slot.path {
        Some(path) => Ok(KeySlot::Derived(path.parse::<DerivationPath>()?)),
        None => Ok(KeySlot::Test),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
