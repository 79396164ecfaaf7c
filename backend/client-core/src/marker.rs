//! The marker file a ready server publishes under its cache directory.
//!
//! The server creates `<cache_dir>/http` once it accepts connections; the
//! content is its listening port as decimal text, possibly surrounded by
//! whitespace. The file is assumed to appear atomically (write-then-rename
//! or a single write), so it is read exactly once with no retry.

use crate::MARKER_FILE_NAME;
use crate::error::StartupError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use log::debug;

/// A listening port read from a marker file. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port(u16);

impl Port {
    pub fn new(port: u16) -> Option<Self> {
        (port != 0).then_some(Self(port))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl Display for Port {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortParseError {
    Empty,
    Invalid { text: String, reason: ParseIntError },
    Zero,
}

impl Display for PortParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::Empty => write!(f, "marker is empty"),
            Self::Invalid { text, reason } => write!(f, "'{text}' is not a port: {reason}"),
            Self::Zero => write!(f, "port 0 is not a listening port"),
        }
    }
}

pub fn marker_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MARKER_FILE_NAME)
}

/// Parse marker content after trimming surrounding whitespace and newlines.
pub fn parse_port(content: &str) -> Result<Port, PortParseError> {
    let text = content.trim();
    if text.is_empty() {
        return Err(PortParseError::Empty);
    }

    let port = text.parse::<u16>().map_err(|reason| PortParseError::Invalid {
        text: text.to_string(),
        reason,
    })?;

    Port::new(port).ok_or(PortParseError::Zero)
}

/// Read and parse the marker at `path`.
///
/// # Errors
///
/// Returns [`StartupError::MarkerRead`] when the file cannot be read, is
/// not UTF-8, or does not hold a port.
pub async fn read_port(path: &Path) -> Result<Port, StartupError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StartupError::marker_read(path, format!("Failed to read marker: {e}")))?;

    let content = String::from_utf8(bytes)
        .map_err(|e| StartupError::marker_read(path, format!("Marker is not UTF-8: {e}")))?;

    let port = parse_port(&content).map_err(|e| StartupError::marker_read(path, e.to_string()))?;

    debug!("Marker {} holds port {port}", path.display());
    Ok(port)
}
