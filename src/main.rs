use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quill::ast::printer;
use quill::error::CompileError;
use quill::parser::Parser as QuillParser;
use quill::{RunConfiguration, Runner, scanner};

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    version,
    about = "Run quill scripts or an interactive session, optionally watching one variable"
)]
struct Cli {
    /// Dump tokens of the script and exit
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST of the script and exit
    #[arg(long)]
    dump_ast: bool,

    /// AST output format
    #[arg(long, default_value = "sexp", value_parser = ["sexp", "json"])]
    ast_format: String,

    /// `watch=<name>` to report writes to <name>, then the script to run
    /// (omit for an interactive session)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn read_source(config: &RunConfiguration) -> Result<(&Path, String)> {
    match &config.script_path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("read source file '{}'", path.display()))?;
            Ok((path.as_path(), source))
        }
        None => bail!("source file required for this operation"),
    }
}

fn report_compile_errors(errors: Vec<CompileError>, path: &Path, source: &str) -> anyhow::Error {
    let count = errors.len();
    for e in errors {
        let report = miette::Report::new(e.with_source_code(path.display().to_string(), source));
        eprintln!("{report:?}");
    }
    anyhow::anyhow!("{count} error(s)")
}

fn dump(cli: &Cli, config: &RunConfiguration) -> Result<()> {
    let (path, source) = read_source(config)?;
    let tokens = scanner::scan(&source).map_err(|e| report_compile_errors(e, path, &source))?;
    if cli.dump_tokens {
        for token in &tokens {
            println!("{token}");
        }
        return Ok(());
    }
    let program = QuillParser::new(tokens)
        .parse()
        .map_err(|e| report_compile_errors(e, path, &source))?;
    match cli.ast_format.as_str() {
        "json" => println!("{}", printer::to_json(&program)),
        _ => print!("{}", printer::to_sexp(&program)),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<i32> {
    let config = RunConfiguration::from_args(&cli.args);
    tracing::debug!(?config, "resolved run configuration");

    if cli.dump_tokens || cli.dump_ast {
        dump(&cli, &config)?;
        return Ok(0);
    }

    Runner::new(config).run()
}

fn main() -> ExitCode {
    // Logs go to stderr so they never mix with program output (respects RUST_LOG)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run(Cli::parse()) {
        // Exit statuses are 8 bits wide; keep the low byte like the OS would.
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            println!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
