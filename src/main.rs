use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use yuho::analysis::Severity;
use yuho::pipeline::{self, AssertionOutcome};
use yuho::transpile::{self, TranspileTarget};
use yuho::verify::alloy::AlloyRunner;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compiler and analysis toolkit for the Yuho legal DSL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and analyze a source file, printing diagnostics.
    Check {
        file: PathBuf,
        /// Also evaluate the module's assert declarations.
        #[arg(long)]
        asserts: bool,
    },
    /// Lower a source file into a target artifact.
    Transpile {
        file: PathBuf,
        /// One of: json, jsonld, english, mermaid, alloy, z3, latex,
        /// graphql, blocks.
        #[arg(short, long)]
        target: String,
        /// Write the artifact here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate an Alloy model and run it through the Alloy Analyzer.
    Verify {
        file: PathBuf,
        /// Path to the Alloy Analyzer jar (defaults to $ALLOY_JAR).
        #[arg(long)]
        alloy_jar: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .context("failed to initialize logging")?;

    match cli.command {
        Command::Check { file, asserts } => {
            let result = pipeline::run_file(&file)?;
            for diagnostic in &result.diagnostics {
                eprintln!("{diagnostic}");
            }

            if asserts {
                for (i, outcome) in pipeline::evaluate_assertions(&result.module)
                    .iter()
                    .enumerate()
                {
                    match outcome {
                        AssertionOutcome::Passed => println!("assert #{}: passed", i + 1),
                        AssertionOutcome::Failed { message } => {
                            println!("assert #{}: FAILED: {message}", i + 1)
                        }
                        AssertionOutcome::Indeterminate => {
                            println!("assert #{}: indeterminate", i + 1)
                        }
                    }
                }
            }

            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Transpile {
            file,
            target,
            output,
        } => {
            let target: TranspileTarget = match target.parse() {
                Ok(target) => target,
                Err(message) => bail!("{message}"),
            };

            let result = pipeline::run_file(&file)?;
            for diagnostic in &result.diagnostics {
                eprintln!("{diagnostic}");
            }

            let artifact = transpile::transpile(&result.module, target);
            match output {
                Some(path) => std::fs::write(&path, artifact)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{artifact}"),
            }

            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Verify { file, alloy_jar } => {
            let result = pipeline::run_file(&file)?;
            for diagnostic in &result.diagnostics {
                eprintln!("{diagnostic}");
            }

            let model = transpile::transpile(&result.module, TranspileTarget::Alloy);
            let runner = AlloyRunner::new(alloy_jar);
            let mut failed = !result.success;

            match runner.analyze(&model) {
                Ok(verdicts) => {
                    for verdict in verdicts {
                        let diagnostic = verdict.to_diagnostic(&file.to_string_lossy());
                        println!("{diagnostic}");
                        if diagnostic.severity == Severity::Error {
                            failed = true;
                        }
                    }
                }
                Err(error) => {
                    eprintln!("{error}");
                    failed = true;
                }
            }

            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
