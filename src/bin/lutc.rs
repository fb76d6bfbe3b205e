// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Compiles a lookup table of one of the built-in operators to C++.
//!
//! Exits with status 0 on success, including `--help` and `--version`, and
//! with status 1 on any failure, including invalid arguments.

use clap::Parser;
use roundkit::context::Context;
use roundkit::lut::codegen::emit_cpp;
use roundkit::lut::codegen::CodegenMode;
use roundkit::lut::codegen::CodegenOptions;
use roundkit::lut::LutGenerator;
use roundkit::ops::Primitive;
use std::fs;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Tabulates a built-in operator over every encoding of its argument
/// formats and emits the table as a C++ function.
///
/// The function is chosen by name with `-n` from the operators this crate
/// implements; functions can't be loaded from source files.
#[derive(Parser, Debug)]
#[command(name = "lutc", version)]
struct Args {
    /// operator to tabulate, like `exp` or `atan2`
    #[arg(short = 'n', long = "name")]
    name: String,
    /// context of each argument, like `ieee754(5, 8, RNE)`; one per argument
    #[arg(short = 'a', long = "arg")]
    args: Vec<Context>,
    /// context of the result
    #[arg(short = 'r', long = "ret")]
    ret: Context,
    /// output file, standard output when absent
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
    #[arg(short = 'm', long = "mode", default_value_t = CodegenMode::Array)]
    mode: CodegenMode,
    /// the function name in the generated code, defaults to the operator's
    #[arg(long = "function")]
    function: Option<String>,
    #[arg(long = "indent", default_value = "    ")]
    indent: String,
    /// log progress to standard error
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let primitive: Primitive = args.name.parse()?;
    let lut = LutGenerator.generate_primitive(primitive, args.args, args.ret)?;
    let lut = match args.function {
        Some(function) => lut.renamed(function),
        None => lut,
    };
    let options = CodegenOptions {
        mode: args.mode,
        indent: args.indent,
    };
    let code = emit_cpp(&lut, &options)?;
    match &args.output {
        Some(path) => {
            fs::write(path, code)?;
            log::info!("wrote {}", path.display());
        }
        None => io::stdout().lock().write_all(code.as_bytes())?,
    }
    Ok(())
}

/// the status for arguments clap rejected, or for `--help` and `--version`
fn exit_code(error: &clap::Error) -> ExitCode {
    if error.use_stderr() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            // nothing useful can be done when stderr is gone
            let _ = error.print();
            return exit_code(&error);
        }
    };
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("lutc: {}", error);
            ExitCode::FAILURE
        }
    }
}
