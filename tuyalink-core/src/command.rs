//! Logical device commands

use std::fmt;

/// Commands a device client issues
///
/// The wire opcode depends on the device kind; see
/// [`CommandCatalog`](crate::catalog::CommandCatalog).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Set data point values
    Control,

    /// Query device status
    Status,

    /// Keep-alive
    Heartbeat,

    /// Query data points
    DataPointQuery,

    /// Set data points, new-style request carrying the data point mask
    ControlNew,

    /// Query data points, new-style request
    DataPointQueryNew,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Self::Control,
        Self::Status,
        Self::Heartbeat,
        Self::DataPointQuery,
        Self::ControlNew,
        Self::DataPointQueryNew,
    ];

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Control => "CONTROL",
            Self::Status => "STATUS",
            Self::Heartbeat => "HEART_BEAT",
            Self::DataPointQuery => "DP_QUERY",
            Self::ControlNew => "CONTROL_NEW",
            Self::DataPointQueryNew => "DP_QUERY_NEW",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_unique() {
        let mut names: Vec<_> = Command::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Command::ALL.len());
    }
}
