use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;

use lc3_sim::asm::{assemble, AsmErr, ObjectFile};
use lc3_sim::err::{report, Error, ParseErr};
use lc3_sim::parse::parse_ast;
use lc3_sim::sim::{SimErr, SimFlags, Simulator};

/// Exit status for any failure to assemble.
const ASM_FAILURE: u8 = 13;
/// Exit status when the program does not halt within `--max-steps`.
const STEP_LIMIT: u8 = 14;

/// Simulates LC-3 object files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Stop the program after this many instructions
    #[arg(long, value_name = "N", global = true)]
    max_steps: Option<u64>,

    /// Execute memory outside of the loaded program instead of stopping
    #[arg(long, global = true)]
    no_detect_unloaded: bool,

    /// Log more (-v for debug, -vv for every instruction)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute an object file
    Run {
        /// Object file to load
        file: PathBuf,
    },
    /// Assemble a source file into an object file
    Asm(AsmArgs),
    /// Assemble a source file, then execute it
    AsmRun(AsmArgs),
}

#[derive(clap::Args, Debug)]
struct AsmArgs {
    /// Assembly source file
    file: PathBuf,

    /// Where to write the object file (defaults to the source path with an `.obj` extension)
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,
}
impl AsmArgs {
    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| self.file.with_extension("obj"))
    }
}

/// Failures of the `asm` and `asm-run` commands before execution starts.
#[derive(Debug, thiserror::Error)]
enum AsmCmdErr {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error(transparent)]
    Parse(#[from] ParseErr),
    #[error(transparent)]
    Asm(#[from] AsmErr),
    #[error("could not write {path}: {source}")]
    Write { path: String, source: std::io::Error },
}
impl Error for AsmCmdErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            AsmCmdErr::Read { .. }  => None,
            AsmCmdErr::Parse(e)     => e.help(),
            AsmCmdErr::Asm(e)       => e.help(),
            AsmCmdErr::Write { .. } => None,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn assemble_file(args: &AsmArgs) -> Result<ObjectFile, AsmCmdErr> {
    let src = fs::read_to_string(&args.file)
        .map_err(|source| AsmCmdErr::Read { path: args.file.display().to_string(), source })?;
    let obj = assemble(parse_ast(&src)?)?;

    let out = args.output_path();
    fs::File::create(&out)
        .and_then(|file| obj.write_to(BufWriter::new(file)))
        .map_err(|source| AsmCmdErr::Write { path: out.display().to_string(), source })?;
    tracing::debug!(path = %out.display(), "wrote object file");

    Ok(obj)
}

fn simulate(cli: &Cli, load: impl FnOnce(&mut Simulator) -> Result<(), SimErr>) -> Result<(), u8> {
    let flags = SimFlags {
        detect_unloaded: !cli.no_detect_unloaded,
        ..Default::default()
    };
    let mut sim = Simulator::new(flags);

    if let Err(e) = load(&mut sim) {
        eprintln!("{}", report(&e));
        return Err(e.code());
    }

    let result = match cli.max_steps {
        Some(n) => sim.run_with_limit(n),
        None => sim.run(),
    };
    if let Err(e) = result {
        eprintln!("{}", report(&e));
        eprintln!("note: at x{:04X}", sim.prefetch_pc());
        return Err(e.code());
    }

    if !sim.hit_halt() {
        eprintln!("error: program did not halt within {} instructions", sim.instructions_run);
        return Err(STEP_LIMIT);
    }
    Ok(())
}

fn assemble_or_report(args: &AsmArgs) -> Result<ObjectFile, u8> {
    assemble_file(args).map_err(|e| {
        eprintln!("{}", report(&e));
        ASM_FAILURE
    })
}

fn run(cli: &Cli) -> Result<(), u8> {
    match &cli.command {
        Command::Run { file } => simulate(cli, |sim| sim.load_obj_path(file)),
        Command::Asm(args) => assemble_or_report(args).map(|_| ()),
        Command::AsmRun(args) => {
            let obj = assemble_or_report(args)?;
            simulate(cli, |sim| {
                sim.load_obj_file(&obj);
                Ok(())
            })
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}
