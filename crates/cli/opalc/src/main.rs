//! Opal compiler CLI
//!
//! Compiles a `.opal` source file to C and hands the result to an
//! external C compiler.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use op_driver::CompileError;
use op_syntax::Diagnostic;
use std::path::{Path, PathBuf};
use std::process::{Command, exit};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "opalc")]
#[command(about = "Compile Opal source to a native executable", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the `.opal` source file
    source: PathBuf,

    /// Output path (defaults to the source path without its extension,
    /// or with `.c` under --emit-c)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after writing the generated C file
    #[arg(long)]
    emit_c: bool,

    /// Directory holding the runtime headers (falls back to
    /// $OPAL_RUNTIME_DIR, then the bundled runtime/)
    #[arg(long)]
    runtime: Option<PathBuf>,

    /// C compiler to invoke
    #[arg(long, default_value = "cc")]
    cc: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let start = Instant::now();

    println!("{} {}", "Compiling".green().bold(), cli.source.display());

    let c_source = match op_driver::compile_file(&cli.source) {
        Ok(c_source) => c_source,
        Err(CompileError::Diagnostic(diagnostic)) => {
            report(&cli.source, &diagnostic);
            exit(2);
        }
        Err(error) => return Err(error.into()),
    };

    if cli.emit_c {
        let c_path = cli
            .output
            .unwrap_or_else(|| cli.source.with_extension("c"));
        std::fs::write(&c_path, c_source)
            .with_context(|| format!("writing {}", c_path.display()))?;
        println!(
            "{} {} in {:.2}s",
            "Finished".green().bold(),
            c_path.display(),
            start.elapsed().as_secs_f64()
        );
        return Ok(());
    }

    let output = cli
        .output
        .unwrap_or_else(|| cli.source.with_extension(""));
    let c_path = output.with_extension("c");
    std::fs::write(&c_path, c_source)
        .with_context(|| format!("writing {}", c_path.display()))?;

    let runtime = runtime_dir(cli.runtime);
    let status = Command::new(&cli.cc)
        .arg(&c_path)
        .arg("-I")
        .arg(&runtime)
        .arg("-o")
        .arg(&output)
        .status()
        .with_context(|| format!("running {}", cli.cc))?;
    if !status.success() {
        // The C compiler already wrote its own messages to stderr.
        exit(status.code().unwrap_or(1));
    }

    println!(
        "{} {} in {:.2}s",
        "Finished".green().bold(),
        output.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// One line on stderr: `file:line:column: message`
fn report(source: &Path, diagnostic: &Diagnostic) {
    match diagnostic.location() {
        Some(location) => eprintln!(
            "{}:{}:{}: {diagnostic}",
            source.display(),
            location.line,
            location.column
        ),
        None => eprintln!("{}: {diagnostic}", source.display()),
    }
}

fn runtime_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("OPAL_RUNTIME_DIR").map(PathBuf::from))
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../runtime"))
}
