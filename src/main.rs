use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use runibus::cpu::Processor;
use runibus::cpu::core::REG_FILE_PC;
use runibus::diag::TracingDiagnostics;
use runibus::machine::{DEFAULT_BATCH, Pdp11};

/// PDP-11 emulator: boot and run a disk image.
#[derive(Parser)]
struct Args {
    /// RK05 disk image to mount as drive zero
    image: PathBuf,

    /// Skip the boot-block read and start cold
    #[arg(long)]
    no_boot: bool,

    /// Start address for the program counter, octal
    #[arg(long, default_value = "0", value_parser = parse_octal)]
    start: u16,

    /// Total instruction budget before stopping
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    steps: usize,

    /// Dump registers after every batch
    #[arg(long)]
    dump: bool,
}

fn parse_octal(text: &str) -> Result<u16, String> {
    u16::from_str_radix(text.trim_start_matches("0o"), 8).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let image = match std::fs::read(&args.image) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("cannot read {}: {err}", args.image.display());
            return ExitCode::FAILURE;
        }
    };

    let mut machine = Pdp11::with_diagnostics(Rc::new(TracingDiagnostics));
    machine.bus.tt.set_sink(Box::new(|ch| {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(&[ch]);
        let _ = out.flush();
    }));

    machine.mount_rk0(&image);
    if !args.no_boot {
        if let Err(fault) = machine.boot_rk0() {
            tracing::error!("boot failed: {fault}");
            return ExitCode::FAILURE;
        }
    }
    machine.cpu.write_register(REG_FILE_PC, args.start);

    let mut remaining = args.steps;
    while remaining > 0 {
        let batch = remaining.min(DEFAULT_BATCH);
        if let Err(err) = machine.run(batch) {
            tracing::error!("{err}");
            machine.dump();
            return ExitCode::FAILURE;
        }
        if args.dump {
            machine.dump();
        }
        remaining -= batch;
    }
    machine.dump();
    ExitCode::SUCCESS
}
