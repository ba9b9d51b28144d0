//! flashdump CLI - dump microcontroller memory to Intel HEX, S-record, hex
//! text or raw binary.
//!
//! ## Features
//!
//! - Dump a memory range from a source (mock board or raw image)
//! - Convert existing raw binaries to record formats
//! - Inspect and verify Intel HEX / S-record files
//! - Serial port discovery
//! - Shell completion generation
//! - Environment variable and config file defaults

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod commands;
mod config;

use config::Config;

/// flashdump - dump microcontroller flash to files standard tools can load.
///
/// Environment variables:
///   FLASHDUMP_ADDRESS   - Default start address (hex)
///   FLASHDUMP_LENGTH    - Default dump length
///   FLASHDUMP_FORMAT    - Default output format (bin, ihex, srec, text)
///   FLASHDUMP_SOURCE    - Default source (mock, mock:<pattern>, file:<path>)
#[derive(Parser)]
#[command(name = "flashdump")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = "Examples:\n  \
    flashdump dump -a 0x08000000 -l 4k -f ihex\n  \
    flashdump convert firmware.bin -a 0x08000000 -f srec\n  \
    flashdump inspect dump_08000000.hex")]
pub(crate) struct Cli {
    /// Verbose output level (-v, -vv, -vvv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Encoder flags shared by `dump` and `convert`.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct EncodeArgs {
    /// Output format: bin, ihex, srec or text.
    #[arg(short, long, env = "FLASHDUMP_FORMAT")]
    pub(crate) format: Option<String>,

    /// Output file ("-" for stdout).
    #[arg(short, long, value_name = "PATH")]
    pub(crate) output: Option<PathBuf>,

    /// Emit Intel HEX extended linear address records (addresses above 0xFFFF).
    #[arg(long)]
    pub(crate) ihex_extended: bool,

    /// Emit an S-record count record and computed S7 terminator.
    #[arg(long)]
    pub(crate) srec_computed: bool,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Dump a memory range and encode it.
    Dump {
        /// Start address (hex, e.g. 0x08000000).
        #[arg(short, long, env = "FLASHDUMP_ADDRESS")]
        address: Option<String>,

        /// Number of bytes (decimal, 0x hex, or with k suffix).
        #[arg(short, long, env = "FLASHDUMP_LENGTH")]
        length: Option<String>,

        /// Where to read from: mock, mock:<ramp|address|erased|fill=XX>, file:<path>[@addr].
        #[arg(short, long, env = "FLASHDUMP_SOURCE")]
        source: Option<String>,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Encode an existing raw binary file.
    Convert {
        /// Raw binary input file.
        input: PathBuf,

        /// Address the first byte of the input was read from (hex).
        #[arg(short, long, default_value = "0")]
        address: String,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Decode and verify an Intel HEX or S-record file.
    Inspect {
        /// Record file to inspect.
        file: PathBuf,

        /// Output information as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long, conflicts_with = "auto")]
        json: bool,

        /// Print only the auto-detected port name (exit code 4 if none).
        #[arg(long)]
        auto: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Errors with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Missing or conflicting arguments after config resolution.
    #[error("{0}")]
    Usage(String),
    /// Unusable configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Cancelled by the user.
    #[error("{0}")]
    Cancelled(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Config(_) => 3,
            Self::Cancelled(_) => 130,
        }
    }
}

/// Map an error chain to a process exit code.
///
/// 1 generic, 2 usage/invalid input, 3 configuration, 4 device not found,
/// 130 cancelled.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(cli_err) = cause.downcast_ref::<CliError>() {
            return cli_err.exit_code();
        }
        if let Some(lib_err) = cause.downcast_ref::<flashdump::Error>() {
            return match lib_err {
                flashdump::Error::InvalidInput(_) => 2,
                flashdump::Error::DeviceNotFound => 4,
                flashdump::Error::Interrupted => 130,
                _ => 1,
            };
        }
    }
    1
}

/// Resolved per-invocation state handed to every command.
pub(crate) struct Session {
    /// Suppress non-essential output.
    pub(crate) quiet: bool,
    /// stderr is a terminal with colors enabled.
    pub(crate) fancy: bool,
    /// Merged configuration.
    pub(crate) config: Config,
}

impl Session {
    /// Print a status line to stderr unless quiet.
    pub(crate) fn status(&self, symbol: console::StyledObject<&str>, message: &str) {
        if !self.quiet {
            eprintln!("{symbol} {message}");
        }
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

/// Route Ctrl-C into the library's interrupt checker.
fn install_interrupt_handler() {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        debug!("Could not install Ctrl-C handler: {e}");
    }
    flashdump::set_interrupt_checker(move || flag.load(Ordering::Relaxed));
}

fn run(cli: Cli) -> Result<()> {
    init_logging(&cli);
    debug!(
        "flashdump v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    let stderr_is_tty = console::Term::stderr().is_term();
    if std::env::var_os("NO_COLOR").is_some() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    install_interrupt_handler();

    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };
    let session = Session {
        quiet: cli.quiet,
        fancy: stderr_is_tty && console::colors_enabled_stderr(),
        config,
    };

    match cli.command {
        Commands::Dump {
            address,
            length,
            source,
            encode,
        } => commands::dump::cmd_dump(
            &session,
            address.as_deref(),
            length.as_deref(),
            source.as_deref(),
            &encode,
        ),
        Commands::Convert {
            input,
            address,
            encode,
        } => commands::dump::cmd_convert(&session, &input, &address, &encode),
        Commands::Inspect { file, json } => commands::inspect::cmd_inspect(&file, json),
        Commands::ListPorts { json, auto } => commands::ports::cmd_list_ports(json, auto),
        Commands::Completions { shell } => {
            commands::completions::cmd_completions(shell);
            Ok(())
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").red().bold());
            ExitCode::from(exit_code_for(&e))
        },
    }
}
