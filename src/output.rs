use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// In-memory output sink whose clones all append to the same buffer.
///
/// Lets the runner, the store and the evaluator share one ordered stream
/// in tests, the way they share stdout in a real process.
#[derive(Clone, Debug, Default)]
pub struct OutputBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_buffer() {
        let buffer = OutputBuffer::default();
        let mut a = buffer.clone();
        let mut b = buffer.clone();
        writeln!(a, "first").expect("write");
        writeln!(b, "second").expect("write");
        assert_eq!(buffer.lines(), vec!["first", "second"]);
    }
}
