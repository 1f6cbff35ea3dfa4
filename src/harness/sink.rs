use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::warn;

use crate::runtime::Value;

/// Where displayed lines go. Clones share the same writer, so the `print`
/// import and the harness interleave their lines in call order.
#[derive(Clone)]
pub struct DisplaySink {
    writer: Rc<RefCell<Box<dyn Write>>>,
}

impl DisplaySink {
    pub fn new(writer: impl Write + 'static) -> Self {
        DisplaySink {
            writer: Rc::new(RefCell::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write one line. A failed write is logged and otherwise ignored.
    pub fn display_line(&self, line: fmt::Arguments) {
        let mut writer = self.writer.borrow_mut();
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!(%err, "failed to write to display sink");
        }
    }

    /// `result = {value}` for a call's results
    pub fn display_result(&self, results: &[Value]) {
        if results.is_empty() {
            self.display_line(format_args!("result = undefined"));
            return;
        }
        let joined = results
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        self.display_line(format_args!("result = {joined}"));
    }

    /// `The result is {value}` for the guest's `print` calls
    pub fn display_print(&self, value: Value) {
        self.display_line(format_args!("The result is {value}"));
    }
}

impl fmt::Debug for DisplaySink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DisplaySink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lines() {
        let out = Shared::default();
        let sink = DisplaySink::new(out.clone());
        sink.display_print(Value::I32(5));
        sink.clone().display_result(&[Value::I32(33)]);
        sink.display_result(&[]);
        sink.display_result(&[Value::I64(1), Value::F64(2.5)]);

        assert_eq!(
            String::from_utf8(out.0.borrow().clone()).unwrap(),
            "The result is 5\nresult = 33\nresult = undefined\nresult = 1 2.5\n"
        );
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let sink = DisplaySink::new(Broken);
        sink.display_result(&[Value::I32(1)]);
        sink.display_print(Value::F32(1.5));
    }
}
