use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};

use nybble::literal;
use nybble::symbol::{Port, Register};
use nybble::{Cpu, Rom};

/// Nybble assembles and runs programs for a tiny 8-bit CPU with 16 registers and 16 I/O ports.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run with default options
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run text `.asm` or binary `.bin` file and print the final machine state
    Run {
        /// `.asm` or `.bin` file to run
        name: PathBuf,
        #[command(flatten)]
        opts: RunOptions,
    },
    /// Create binary `.bin` file holding the program image
    Compile {
        /// `.asm` file to compile
        name: PathBuf,
        /// Destination to output .bin file
        dest: Option<PathBuf>,
    },
    /// Check a `.asm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunOptions {
    /// Number of instructions to execute
    #[arg(short, long, default_value_t = 256)]
    steps: usize,
    /// Value to place on an input port before running, eg. `i0=0x2A`
    #[arg(short, long = "input", value_name = "PORT=VALUE", value_parser = parse_input)]
    inputs: Vec<(Port, u8)>,
    /// Seed for `rnv`, overrides NYBBLE_SEED
    #[arg(long)]
    seed: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            steps: 256,
            inputs: Vec::new(),
            seed: None,
        }
    }
}

fn main() -> Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    env_logger::init();
    nybble::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(nybble::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match (args.command, args.path) {
        (Some(Command::Run { name, opts }), _) => run(&name, opts),
        (Some(Command::Compile { name, dest }), _) => {
            file_message(Green, "Assembling", &name);
            let bytes = assemble_file(&name)?;
            let out_file_name = dest.unwrap_or_else(|| name.with_extension("bin"));
            fs::write(&out_file_name, &bytes).into_diagnostic()?;
            message(Green, "Finished", &format!("emit {} bytes", bytes.len()));
            file_message(Green, "Saved", &out_file_name);
            Ok(())
        }
        (Some(Command::Check { name }), _) => {
            file_message(Green, "Checking", &name);
            assemble_file(&name)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        (None, Some(path)) => run(&path, RunOptions::default()),
        (None, None) => {
            println!("\n~ {} v{VERSION} ~", "nybble".bold());
            println!("{SHORT_INFO}");
            std::process::exit(0);
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, opts: RunOptions) -> Result<()> {
    let rom = match name.extension().and_then(|ext| ext.to_str()) {
        Some("bin") => {
            file_message(MsgColor::Green, "Loading", name);
            let bytes = fs::read(name).into_diagnostic()?;
            Rom::from_bytes(&bytes)?
        }
        Some("asm") => {
            file_message(MsgColor::Green, "Assembling", name);
            Rom::from_bytes(&assemble_file(name)?)?
        }
        Some(_) => bail!("File has unknown extension. Exiting..."),
        None => bail!("File has no extension. Exiting..."),
    };

    let mut cpu = match opts.seed.or_else(nybble::env::seed) {
        Some(seed) => Cpu::with_seed(rom, seed),
        None => Cpu::new(rom),
    };
    for (port, val) in opts.inputs {
        cpu.set_input(port.code(), val)?;
    }

    message(
        MsgColor::Green,
        "Running",
        &format!("{} instructions", opts.steps),
    );
    cpu.run(opts.steps);
    file_message(MsgColor::Green, "Completed", name);

    print_state(&cpu);
    Ok(())
}

/// Return the program image of a source file
fn assemble_file(name: &Path) -> Result<Vec<u8>> {
    let contents = fs::read_to_string(name).into_diagnostic()?;
    nybble::assemble(&contents)
}

fn print_state(cpu: &Cpu) {
    println!("\n{}", "Outputs".cyan());
    let outputs = Port::ALL.iter().filter(|port| !port.is_input());
    for (port, val) in outputs.zip(cpu.ports().outputs()) {
        println!("{port:>6} = {val:#04x} ({val})");
    }

    println!("\n{}", "Registers".cyan());
    for row in Register::ALL
        .iter()
        .zip(cpu.registers().iter())
        .collect::<Vec<_>>()
        .chunks(4)
    {
        let row: Vec<_> = row
            .iter()
            .map(|(reg, val)| format!("{reg:>6} = {val:#04x}"))
            .collect();
        println!("{}", row.join(""));
    }
    println!("{:>6} = {:#04x}", "pc", cpu.pc());
}

/// Parse `PORT=VALUE` given to `--input`.
fn parse_input(arg: &str) -> std::result::Result<(Port, u8), String> {
    let Some((port, value)) = arg.split_once('=') else {
        return Err(format!("expected PORT=VALUE, found `{arg}`"));
    };
    let port: Port = port
        .trim()
        .parse()
        .map_err(|_| format!("unknown port `{port}`"))?;
    if !port.is_input() {
        return Err(format!("`{port}` is an output port, only i0 to i7 can be driven"));
    }
    let value = literal::parse_byte(value.trim()).map_err(|e| e.to_string())?;
    Ok((port, value))
}

const SHORT_INFO: &str = r"
Welcome to nybble, an assembler and simulator for a tiny 8-bit CPU.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
