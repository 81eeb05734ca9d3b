//! Batch and interactive execution over one persistent variable store.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::RunConfiguration;
use crate::error::ShellError;
use crate::interpreter::store::VariableStore;
use crate::interpreter::{Interpreter, RunSignal};
use crate::parser::Parser;
use crate::repl::{LineReader, Lines, Terminal};
use crate::scanner;

pub const PROMPT: &str = ">> ";

/// Owns the variable store for the life of the process and drives the
/// scan, parse and evaluate pipeline over it.
pub struct Runner {
    config: RunConfiguration,
    store: VariableStore,
    interpreter: Interpreter,
    out: Box<dyn Write>,
    prompt_out: Option<Box<dyn Write>>,
}

impl Runner {
    /// Runner writing everything to stdout.
    pub fn new(config: RunConfiguration) -> Self {
        let store = VariableStore::new(config.watch_target.clone());
        Self {
            config,
            store,
            interpreter: Interpreter::new(),
            out: Box::new(io::stdout()),
            prompt_out: Some(Box::new(io::stdout())),
        }
    }

    /// Runner whose store, evaluator, prompts and own messages all write
    /// to `out`.
    pub fn with_output<W: Write + Clone + 'static>(config: RunConfiguration, out: W) -> Self {
        let store = VariableStore::with_sink(config.watch_target.clone(), Box::new(out.clone()));
        Self {
            config,
            store,
            interpreter: Interpreter::with_writer(Box::new(out.clone())),
            prompt_out: Some(Box::new(out.clone())),
            out: Box::new(out),
        }
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Run in the mode the configuration selects and return the exit code.
    pub fn run(&mut self) -> Result<i32> {
        if let Some(target) = &self.config.watch_target {
            let banner = format!("--> Debug mode enabled. Watching: {target}");
            self.emit(&banner);
        }
        match self.config.script_path.clone() {
            Some(path) => Ok(self.run_batch(&path)),
            None if io::stdin().is_terminal() => {
                let mut terminal = Terminal::new().context("create line editor")?;
                Ok(self.run_interactive(&mut terminal))
            }
            None => {
                let mut lines = self.piped(io::stdin().lock());
                Ok(self.run_interactive(&mut lines))
            }
        }
    }

    /// Line source over non-terminal input, prompting on the runner's output.
    pub fn piped<R: BufRead>(&mut self, reader: R) -> Lines<R> {
        let prompt_out = self
            .prompt_out
            .take()
            .unwrap_or_else(|| Box::new(io::stdout()));
        Lines::with_prompt(reader, prompt_out)
    }

    /// Run a whole script once. Any error is reported and yields 1.
    pub fn run_batch(&mut self, path: &Path) -> i32 {
        tracing::debug!(path = %path.display(), "batch mode");
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(source) => {
                let err = ShellError::Io {
                    path: path.to_path_buf(),
                    source,
                };
                self.report(&err.describe(""));
                return 1;
            }
        };
        match self.execute(&source) {
            Ok(signal) => {
                if let RunSignal::Terminate(value) = &signal {
                    tracing::debug!(%value, "script terminated");
                }
                signal.exit_code()
            }
            Err(e) => {
                self.report(&e.describe(&source));
                1
            }
        }
    }

    /// Read-evaluate-print loop. Errors are reported per line and the loop
    /// goes on; only `exit`/`quit`, an `exit` statement or end of input stop it.
    pub fn run_interactive(&mut self, input: &mut dyn LineReader) -> i32 {
        tracing::debug!("interactive mode");
        let banner = match &self.config.watch_target {
            Some(target) => format!("Interactive Mode. Watching: {target}"),
            None => "Interactive Mode. ".to_string(),
        };
        self.emit(&banner);

        loop {
            let line = match input.read_line(PROMPT) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    self.report(&format!("could not read input: {e}"));
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed == "exit" || trimmed == "quit" {
                return 0;
            }
            if trimmed.is_empty() {
                continue;
            }

            match self.execute(&line) {
                Ok(signal) => match &signal {
                    RunSignal::Terminate(value) => {
                        self.emit(&format!("Exiting with code: {value}"));
                        return signal.exit_code();
                    }
                    RunSignal::Continue(Some(value)) => self.emit(&value.to_string()),
                    RunSignal::Continue(None) => {}
                },
                Err(e) => self.report(&e.describe(&line)),
            }
        }
        0
    }

    /// One pass of the pipeline over `source` against the persistent store.
    fn execute(&mut self, source: &str) -> Result<RunSignal, ShellError> {
        let tokens = scanner::scan(source).map_err(ShellError::Lex)?;
        tracing::debug!(tokens = tokens.len(), "scanned");
        let program = Parser::new(tokens).parse().map_err(ShellError::Syntax)?;
        tracing::debug!(statements = program.statements.len(), "parsed");
        Ok(self.interpreter.evaluate(&program, &mut self.store)?)
    }

    fn report(&mut self, description: &str) {
        self.emit(&format!("Error: {description}"));
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            tracing::warn!("failed to write output: {e}");
        }
    }
}
