//! Debug logging sink
//!
//! Cache chatter is only emitted when the `debug` option is set. Failures
//! worth seeing regardless go straight through `tracing::warn!`.

/// Logs cache activity when enabled, does nothing otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
    enabled: bool,
}

impl Logger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&self, message: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        tracing::debug!(target: "hotzenplotz", "{}", message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        assert!(!Logger::default().enabled());
        assert!(Logger::new(true).enabled());

        // No subscriber installed, both must be silent no-ops
        Logger::default().log("ignored");
        Logger::new(true).log(String::from("emitted"));
    }
}
