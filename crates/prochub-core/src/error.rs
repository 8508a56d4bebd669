use thiserror::Error;

/// Everything a [`crate::Supervisor`] operation can fail with. All variants
/// are returned to the immediate caller; a failure on one process never
/// takes down the supervisor or affects its other processes.
#[derive(Debug, Error)]
pub enum SupervisorError {
	#[error("unknown process: {0}")]
	UnknownProcess(String),

	#[error("{0} is already running")]
	AlreadyRunning(String),

	#[error("{0} is not running")]
	NotRunning(String),

	/// The spawn itself succeeded but the process was already gone at the
	/// first liveness check. Carries whatever output was captured before
	/// exit, newest first, for diagnosing misconfigured commands.
	#[error("process {name} exited immediately after start")]
	ExitedImmediately { name: String, logs: Vec<String> },

	/// The OS refused to create the process: bad working directory,
	/// unresolvable command, permission denied.
	#[error("failed to spawn {name}: {source}")]
	SpawnFailed {
		name: String,
		#[source]
		source: std::io::Error,
	},

	/// A termination signal could not be delivered. A process that is
	/// already gone is not this; that case is silently skipped.
	#[error("failed to signal pid {pid}: {errno}")]
	TerminationFailed { pid: u32, errno: nix::errno::Errno },
}

impl SupervisorError {
	/// Process-level conflicts a transport layer should report as client
	/// errors rather than server failures.
	pub fn is_conflict(&self) -> bool {
		matches!(
			self,
			SupervisorError::AlreadyRunning(_)
				| SupervisorError::NotRunning(_)
				| SupervisorError::ExitedImmediately { .. }
		)
	}
}
