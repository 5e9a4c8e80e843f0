use model::core::utils::{format_bytes, format_elapsed};
use std::{fmt, time::Duration};
use tracing::info;

/// One line of storage telemetry: what was done to which resource, how long
/// it took, and how much it moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReport {
    pub action: String,
    pub resource: String,
    pub elapsed: Duration,
    pub rows: usize,
    pub memory: usize,
}

impl StorageReport {
    pub fn new(action: &str, resource: &str, elapsed: Duration, rows: usize, memory: usize) -> Self {
        Self {
            action: action.to_string(),
            resource: resource.to_string(),
            elapsed,
            rows,
            memory,
        }
    }

    pub fn log(&self) {
        info!(
            action = %self.action,
            resource = %self.resource,
            elapsed_ms = self.elapsed.as_millis() as u64,
            rows = self.rows,
            memory = self.memory,
            "{self}"
        );
    }
}

impl fmt::Display for StorageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {} rows in {} ({})",
            self.action,
            self.resource,
            self.rows,
            format_elapsed(self.elapsed),
            format_bytes(self.memory as u64)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line() {
        let report = StorageReport::new("pull", "discord_users", Duration::from_millis(250), 42, 2048);
        assert_eq!(report.to_string(), "pull: discord_users, 42 rows in 250ms (2.0 KB)");
    }
}
