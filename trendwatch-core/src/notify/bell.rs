//! Audible terminal bell.

use std::io::Write;
use std::sync::Mutex;

use super::{Alert, AlertSink, SinkError};

pub struct TerminalBell {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalBell {
    /// Ring on stderr, leaving stdout free for reports.
    pub fn new() -> Self {
        Self::with_writer(std::io::stderr())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }
}

impl Default for TerminalBell {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for TerminalBell {
    fn name(&self) -> &str {
        "bell"
    }

    fn deliver(&self, _alert: &Alert) -> Result<(), SinkError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| SinkError::Delivery("bell writer poisoned".into()))?;
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::sample_alert;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_bel_per_alert() {
        let buf = Shared::default();
        let bell = TerminalBell::with_writer(buf.clone());
        let alert = sample_alert();
        bell.deliver(&alert).unwrap();
        bell.deliver(&alert).unwrap();
        assert_eq!(buf.0.lock().unwrap().as_slice(), b"\x07\x07");
    }
}
