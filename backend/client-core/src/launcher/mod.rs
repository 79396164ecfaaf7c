//! Starting the analysis server process.
//!
//! The coordinator never waits on a launch to connect: the process handle
//! it yields is diagnostic only.

pub mod command;

pub use command::CommandLauncher;

use crate::config::ProjectConfig;
use crate::error::launch::LaunchError;

use std::fmt::{Display, Formatter, Result as FormatResult};

use sysinfo::{Pid, ProcessesToUpdate, System};

/// Identifies a launched server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pid: u32,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the process still exists, as seen by the OS process table.
    pub fn is_running(&self) -> bool {
        let pid = Pid::from_u32(self.pid);
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        sys.process(pid).is_some()
    }
}

impl Display for ProcessHandle {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "PID {}", self.pid)
    }
}

pub trait ServerLauncher: Send + Sync + 'static {
    /// Start the server for `config`, resolving once the process exists.
    ///
    /// Must not wait for the server to become ready; readiness is signalled
    /// by the marker file.
    fn launch(
        &self,
        config: &ProjectConfig,
    ) -> impl Future<Output = Result<ProcessHandle, LaunchError>> + Send;
}
