/*!
diag.rs - Injected diagnostics seam.

The core never prints and never requires a process-wide logger. Anything
that wants to narrate (HALT, UNIBUS RESET, unimplemented device register
traffic) talks to a `Diagnostics` implementation handed in at
construction time. `NullDiagnostics` is the default and discards
everything; `TracingDiagnostics` forwards to the `tracing` macros for
binaries that install a subscriber.
*/

use std::rc::Rc;

/// Severity-split message sink injected into the CPU, bus and devices.
pub trait Diagnostics {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Discards all messages. Default collaborator for embedding and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Forwards messages to the `tracing` ecosystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Shared handle used throughout a machine (the core is single-threaded).
pub type DiagHandle = Rc<dyn Diagnostics>;

/// Convenience constructor for the no-op handle.
pub fn null_diag() -> DiagHandle {
    Rc::new(NullDiagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Sink that records messages, for asserting device narration.
    #[derive(Default)]
    struct CapturedDiagnostics {
        lines: RefCell<Vec<String>>,
    }

    impl Diagnostics for CapturedDiagnostics {
        fn info(&self, message: &str) {
            self.lines.borrow_mut().push(format!("info:{message}"));
        }
        fn warn(&self, message: &str) {
            self.lines.borrow_mut().push(format!("warn:{message}"));
        }
        fn error(&self, message: &str) {
            self.lines.borrow_mut().push(format!("error:{message}"));
        }
    }

    #[test]
    fn null_sink_discards() {
        let diag = null_diag();
        diag.info("nothing");
        diag.warn("nothing");
        diag.error("nothing");
    }

    #[test]
    fn captured_sink_records_severity() {
        let diag = CapturedDiagnostics::default();
        diag.info("a");
        diag.warn("b");
        assert_eq!(
            *diag.lines.borrow(),
            vec!["info:a".to_string(), "warn:b".to_string()]
        );
    }
}
