use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to run for one logical process name: a working directory plus argv.
/// Immutable once loaded; reloading the catalog replaces whole values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDef {
	pub dir: PathBuf,
	pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessState {
	Running { pid: u32 },
	Stopped,
}

impl ProcessState {
	pub fn is_running(&self) -> bool {
		matches!(self, ProcessState::Running { .. })
	}

	pub fn pid(&self) -> Option<u32> {
		match self {
			ProcessState::Running { pid } => Some(*pid),
			ProcessState::Stopped => None,
		}
	}
}

/// Point-in-time view of one managed process, as handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSnapshot {
	pub name: String,
	pub state: ProcessState,
	pub pid: Option<u32>,
	/// Captured output lines, newest first.
	pub logs: Vec<String>,
	/// Bytes of output appended since the logs were last drained.
	pub unread_bytes: usize,
}
