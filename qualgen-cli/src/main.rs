#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate failure;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::exit;

use docopt::Docopt;
use failure::Fallible;

use qualgen_driver::{run_pipeline, SolverConfig};
use qualgen_ir::QError;
use qualgen_smt::Backend;

mod loader;

const USAGE: &'static str = "
qualgen: Horn-clause qualifier synthesis via tree interpolation.

Usage:
  qualgen <finfo> [options]
  qualgen (-h | --help)

Options:
  --help              Show this screen.
  --depth=N            Unroll depth budget for every k-variable [default: 2].
  --solver=NAME        Interpolating backend: mathsat, z3, z3-legacy, or cvc4 [default: mathsat].
  --solver-path=PATH   Override the solver executable name/path.
  --log=PATH           Write the full SMT-LIB2 dialogue to PATH.
  --debug=<level>      Enable tracing output at <level> (e.g. debug, trace,
                        qualgen_solve=trace), same spelling as chalk-repl's
                        `debug <level>` REPL command.
";

#[derive(Debug, Deserialize)]
struct Args {
    arg_finfo: String,
    flag_depth: usize,
    flag_solver: String,
    flag_solver_path: Option<String>,
    flag_log: Option<String>,
    flag_debug: Option<String>,
}

fn run() -> Fallible<()> {
    let args: Args = Docopt::new(USAGE).and_then(|d| d.deserialize()).unwrap_or_else(|e| e.exit());

    if let Some(level) = &args.flag_debug {
        // chalk-repl's `debug <level>` sets `CHALK_DEBUG` to the level
        // string for its own search-engine `tracing` calls to pick up;
        // this is a one-shot CLI with no later REPL command to react to
        // it, so the level is installed into the subscriber's filter
        // directly instead of going through an env var.
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(tracing_subscriber::EnvFilter::new(level))
            .init();
    }

    let backend: Backend = args.flag_solver.parse().map_err(|e: QError| format_err!("{}", e))?;

    let mut text = String::new();
    File::open(&args.arg_finfo)?.read_to_string(&mut text)?;
    let finfo = loader::load_finfo(&text).map_err(|e| format_err!("{}", e))?;

    let mut config = SolverConfig::new(backend, args.flag_depth);
    config.solver_path = args.flag_solver_path.clone();
    config.log_path = args.flag_log.clone().map(PathBuf::from);

    let qualifiers = run_pipeline(&finfo, &config).map_err(|e| format_err!("{}", e))?;

    for q in &qualifiers {
        let params = q
            .params
            .iter()
            .map(|(s, sort)| format!("{}: {}", s, sort))
            .collect::<Vec<_>>()
            .join(", ");
        println!("qualif {}({}): {:?}", q.name, params, q.body);
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        exit(exit_code_for(&e));
    }
}

/// Maps a top-level failure to an exit code distinguishing malformed
/// input (§7's `InputError`/sort-lookup family) from a solver/process
/// failure, the way a CLI's exit status should let a calling script tell
/// "fix your input" apart from "the environment is broken" without
/// parsing stderr text.
fn exit_code_for(e: &failure::Error) -> i32 {
    if let Some(q) = e.downcast_ref::<QError>() {
        match q {
            QError::InputError { .. } | QError::SortLookupMiss { .. } | QError::UnknownKVar { .. } => 2,
            QError::UnrollInvariantError { .. } | QError::CutInterpolantMismatch { .. } => 3,
            QError::SmtProtocolError { .. } | QError::SmtProcessError { .. } | QError::Io(_) => 4,
        }
    } else {
        1
    }
}
