//! Line sources for interactive mode.

use std::io::{self, BufRead, Write};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Something that can prompt for and return one line of input.
pub trait LineReader {
    /// Next line without its line terminator, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Line editor on the controlling terminal, with in-memory history.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for Terminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                    tracing::warn!("failed to add history entry: {e}");
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the current line and prompts again.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
}

/// Lines from any buffered reader, echoing the prompt to `prompt_out`.
pub struct Lines<R> {
    reader: R,
    prompt_out: Option<Box<dyn Write>>,
}

impl<R: BufRead> Lines<R> {
    /// Reader that does not print prompts.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt_out: None,
        }
    }

    pub fn with_prompt(reader: R, prompt_out: Box<dyn Write>) -> Self {
        Self {
            reader,
            prompt_out: Some(prompt_out),
        }
    }
}

impl<R: BufRead> LineReader for Lines<R> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if let Some(out) = self.prompt_out.as_mut() {
            write!(out, "{prompt}")?;
            out.flush()?;
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputBuffer;

    #[test]
    fn lines_strip_terminators() {
        let mut lines = Lines::new("x = 1\r\ny = 2\nlast".as_bytes());
        assert_eq!(lines.read_line(">> ").expect("read"), Some("x = 1".to_string()));
        assert_eq!(lines.read_line(">> ").expect("read"), Some("y = 2".to_string()));
        assert_eq!(lines.read_line(">> ").expect("read"), Some("last".to_string()));
        assert_eq!(lines.read_line(">> ").expect("read"), None);
    }

    #[test]
    fn blank_line_is_not_end_of_input() {
        let mut lines = Lines::new("\n".as_bytes());
        assert_eq!(lines.read_line(">> ").expect("read"), Some(String::new()));
        assert_eq!(lines.read_line(">> ").expect("read"), None);
    }

    #[test]
    fn prompt_is_echoed() {
        let buffer = OutputBuffer::default();
        let mut lines = Lines::with_prompt("x\n".as_bytes(), Box::new(buffer.clone()));
        lines.read_line(">> ").expect("read");
        lines.read_line(">> ").expect("read");
        assert_eq!(buffer.contents(), ">> >> ");
    }
}
