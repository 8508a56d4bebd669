use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::{HashMap, VecDeque};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::SupervisorError;

/// Every pid currently descended from `root`, breadth first (children before
/// grandchildren). Built from one pass over the OS process table.
pub fn descendants(root: u32) -> Vec<u32> {
	let mut system = System::new();
	system.refresh_processes_specifics(
		ProcessesToUpdate::All,
		true,
		ProcessRefreshKind::nothing(),
	);

	let mut by_parent: HashMap<u32, Vec<u32>> = HashMap::new();
	for (pid, process) in system.processes() {
		if let Some(parent) = process.parent() {
			by_parent.entry(parent.as_u32()).or_default().push(pid.as_u32());
		}
	}

	let mut result = Vec::new();
	let mut queue = VecDeque::from([root]);
	while let Some(pid) = queue.pop_front() {
		if let Some(children) = by_parent.get(&pid) {
			for &child in children {
				result.push(child);
				queue.push_back(child);
			}
		}
	}
	result
}

/// Requests termination of the whole tree under `root`: every descendant
/// first, then the root itself. Enumeration happens before any signal is
/// sent, since killing a parent first can reparent its children out of view.
/// SIGTERM only; no forced-kill escalation.
pub fn terminate_tree(root: u32) -> Result<(), SupervisorError> {
	for pid in descendants(root) {
		send_term(pid)?;
	}
	send_term(root)
}

fn send_term(pid: u32) -> Result<(), SupervisorError> {
	match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
		// ESRCH: already exited between enumeration and signal
		Ok(()) | Err(Errno::ESRCH) => Ok(()),
		Err(errno) => Err(SupervisorError::TerminationFailed { pid, errno }),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn descendants_sees_spawned_child() {
		let mut child = std::process::Command::new("sleep")
			.arg("30")
			.spawn()
			.unwrap();

		let pids = descendants(std::process::id());
		assert!(pids.contains(&child.id()), "descendants were: {:?}", pids);

		let _ = child.kill();
		let _ = child.wait();
	}

	#[test]
	fn terminate_tree_on_dead_pid_is_ok() {
		let mut child = std::process::Command::new("true").spawn().unwrap();
		let pid = child.id();
		let _ = child.wait();

		// Already gone: ESRCH is silently skipped, not an error.
		assert!(terminate_tree(pid).is_ok());
	}
}
