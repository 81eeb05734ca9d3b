pub mod ast;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod output;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod scanner;

// Re-export the types most callers need
pub use config::RunConfiguration;
pub use error::{CompileError, RuntimeError, ShellError};
pub use interpreter::store::VariableStore;
pub use interpreter::value::Value;
pub use interpreter::{Interpreter, RunSignal};
pub use runner::Runner;
