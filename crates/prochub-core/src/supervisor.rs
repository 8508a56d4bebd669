use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::error::SupervisorError;
use crate::logs::LogBuffer;
use crate::proctree;
use crate::types::{ProcessDef, ProcessSnapshot, ProcessState};

/// How long a freshly spawned process gets before the crash-on-start check.
const SPAWN_GRACE: Duration = Duration::from_millis(150);

/// Exit-poll interval once both output streams have reached end-of-stream.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Live record for one managed process. Exactly one handle exists per
/// catalog name; the name is the stable identity across catalog reloads.
pub struct ProcessHandle {
	pub name: String,
	pub def: ProcessDef,
	pub state: ProcessState,
	pub logs: LogBuffer,
}

impl ProcessHandle {
	fn new(name: &str, def: ProcessDef) -> Self {
		Self {
			name: name.to_string(),
			def,
			state: ProcessState::Stopped,
			logs: LogBuffer::new(),
		}
	}

	/// Snapshot without draining: the unread counter is left for the next
	/// actual log read.
	fn peek(&self) -> ProcessSnapshot {
		ProcessSnapshot {
			name: self.name.clone(),
			pid: self.state.pid(),
			state: self.state.clone(),
			logs: self.logs.snapshot(),
			unread_bytes: self.logs.unread_bytes(),
		}
	}

	/// Snapshot for a log reader: drains the buffer, resetting the unread
	/// counter.
	fn drain_view(&mut self) -> ProcessSnapshot {
		let (logs, unread_bytes) = self.logs.drain();
		ProcessSnapshot {
			name: self.name.clone(),
			pid: self.state.pid(),
			state: self.state.clone(),
			logs,
			unread_bytes,
		}
	}
}

type HandleRef = Arc<Mutex<ProcessHandle>>;
type StdoutLines = Lines<BufReader<ChildStdout>>;
type StderrLines = Lines<BufReader<ChildStderr>>;

/// Registry and lifecycle controller for the full process catalog.
///
/// Lock order is registry before handle, everywhere. The registry read lock
/// lets lifecycle operations on different names proceed concurrently; the
/// per-handle mutex serializes start, stop, and the poller's exit cleanup
/// for a single name. `reconcile` takes the registry write lock, so removal
/// of a name cannot race a start or stop of that same name.
pub struct Supervisor {
	handles: RwLock<HashMap<String, HandleRef>>,
}

impl Supervisor {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			handles: RwLock::new(HashMap::new()),
		})
	}

	/// Applies a freshly loaded catalog to the managed set. Kept names have
	/// their definition replaced in place: a running process keeps running
	/// under its old spawn and picks up the new definition on its next
	/// start. New names appear stopped. Dropped names are stopped (process
	/// tree terminated) and removed.
	pub async fn reconcile(&self, catalog: &Catalog) {
		let mut handles = self.handles.write().await;

		let dropped: Vec<String> = handles
			.keys()
			.filter(|name| !catalog.definitions.contains_key(*name))
			.cloned()
			.collect();
		for name in dropped {
			if let Some(handle) = handles.remove(&name) {
				let mut h = handle.lock().await;
				if let Some(pid) = h.state.pid() {
					if let Err(e) = proctree::terminate_tree(pid) {
						tracing::error!("failed to stop removed process {}: {}", name, e);
					}
					h.state = ProcessState::Stopped;
				}
				tracing::warn!("removed process {}", name);
			}
		}

		for (name, def) in &catalog.definitions {
			match handles.get(name) {
				Some(handle) => {
					let mut h = handle.lock().await;
					if h.def != *def {
						h.def = def.clone();
						tracing::info!("updated definition for {}", name);
					}
				}
				None => {
					handles.insert(
						name.clone(),
						Arc::new(Mutex::new(ProcessHandle::new(name, def.clone()))),
					);
					tracing::info!("managing new process {}", name);
				}
			}
		}
	}

	async fn handle(&self, name: &str) -> Result<HandleRef, SupervisorError> {
		let handles = self.handles.read().await;
		handles
			.get(name)
			.cloned()
			.ok_or_else(|| SupervisorError::UnknownProcess(name.to_string()))
	}

	/// Spawns the process behind `name` and binds a poller to it. The
	/// handle lock is held across the whole operation, so a concurrent
	/// start on the same name observes `Running` and fails instead of
	/// spawning a second process.
	pub async fn start(&self, name: &str) -> Result<ProcessSnapshot, SupervisorError> {
		let handle = self.handle(name).await?;
		let mut h = handle.lock().await;
		if h.state.is_running() {
			return Err(SupervisorError::AlreadyRunning(name.to_string()));
		}

		let (program, args) =
			h.def
				.command
				.split_first()
				.ok_or_else(|| SupervisorError::SpawnFailed {
					name: name.to_string(),
					source: std::io::Error::new(
						std::io::ErrorKind::InvalidInput,
						"empty command",
					),
				})?;

		let mut child = Command::new(program)
			.args(args)
			.current_dir(&h.def.dir)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|source| SupervisorError::SpawnFailed {
				name: name.to_string(),
				source,
			})?;

		let pid = child.id().unwrap_or(0);
		let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
		let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

		h.state = ProcessState::Running { pid };
		tracing::info!("started process {} with pid {}", name, pid);

		// Crash-on-start check: give the child a moment, then poll its exit
		// status once.
		tokio::time::sleep(SPAWN_GRACE).await;
		if let Ok(Some(status)) = child.try_wait() {
			drain_remaining(&mut h.logs, &mut stdout, &mut stderr).await;
			h.state = ProcessState::Stopped;
			tracing::warn!(
				"process {} with pid {} exited immediately after start ({})",
				name,
				pid,
				status
			);
			return Err(SupervisorError::ExitedImmediately {
				name: name.to_string(),
				logs: h.logs.snapshot(),
			});
		}

		tokio::spawn(poll_process(
			Arc::clone(&handle),
			child,
			pid,
			stdout,
			stderr,
		));

		Ok(h.peek())
	}

	/// Terminates the process tree behind `name` and transitions the handle
	/// to stopped before returning. The bound poller observes the exit on
	/// its own and finds the pid already cleared, making its cleanup a
	/// no-op.
	pub async fn stop(&self, name: &str) -> Result<ProcessSnapshot, SupervisorError> {
		let handle = self.handle(name).await?;
		let mut h = handle.lock().await;
		let pid = h
			.state
			.pid()
			.ok_or_else(|| SupervisorError::NotRunning(name.to_string()))?;

		proctree::terminate_tree(pid)?;

		h.state = ProcessState::Stopped;
		tracing::info!("stopped process {} with pid {}", name, pid);
		Ok(h.peek())
	}

	/// The lifecycle state as maintained by start/stop/poller. No OS-level
	/// liveness re-check happens here.
	pub async fn status(&self, name: &str) -> Result<ProcessState, SupervisorError> {
		let handle = self.handle(name).await?;
		let h = handle.lock().await;
		Ok(h.state.clone())
	}

	/// Drained snapshot of one managed process.
	pub async fn get(&self, name: &str) -> Result<ProcessSnapshot, SupervisorError> {
		let handle = self.handle(name).await?;
		let mut h = handle.lock().await;
		Ok(h.drain_view())
	}

	/// Drained snapshot of every managed process, sorted by name.
	pub async fn list_all(&self) -> Vec<ProcessSnapshot> {
		let handles = self.handles.read().await;
		let mut result = Vec::with_capacity(handles.len());
		for handle in handles.values() {
			let mut h = handle.lock().await;
			result.push(h.drain_view());
		}
		result.sort_by(|a, b| a.name.cmp(&b.name));
		result
	}

	/// Captured logs for one name, newest first, plus the bytes appended
	/// since the previous read. A name with no handle yields empty and
	/// zero rather than an error.
	pub async fn logs(&self, name: &str) -> (Vec<String>, usize) {
		match self.handle(name).await {
			Ok(handle) => {
				let mut h = handle.lock().await;
				h.logs.drain()
			}
			Err(_) => (Vec::new(), 0),
		}
	}
}

/// One poller runs per successful start, bound 1:1 to the pid it was
/// spawned for and never reused across restarts. It drains the merged
/// stdout/stderr capture into the handle's log buffer and owns the only
/// authoritative exit check; end-of-stream alone is never treated as exit.
async fn poll_process(
	handle: HandleRef,
	mut child: Child,
	pid: u32,
	mut stdout: Option<StdoutLines>,
	mut stderr: Option<StderrLines>,
) {
	let mut out_done = stdout.is_none();
	let mut err_done = stderr.is_none();

	loop {
		if out_done && err_done {
			// Output fully drained; only the exit check remains.
			tokio::time::sleep(EXIT_POLL_INTERVAL).await;
		} else {
			tokio::select! {
				read = next_line(&mut stdout), if !out_done => match read {
					Ok(Some(line)) => handle.lock().await.logs.append(line),
					Ok(None) => out_done = true,
					Err(e) => {
						// Transient read error: retry, this is not exit.
						tracing::debug!("read error on pid {}: {}", pid, e);
					}
				},
				read = next_line(&mut stderr), if !err_done => match read {
					Ok(Some(line)) => handle.lock().await.logs.append(line),
					Ok(None) => err_done = true,
					Err(e) => {
						tracing::debug!("read error on pid {}: {}", pid, e);
					}
				},
			}
		}

		match child.try_wait() {
			Ok(Some(status)) => {
				let mut h = handle.lock().await;
				drain_remaining(&mut h.logs, &mut stdout, &mut stderr).await;
				// An explicit stop may already have cleared the pid; only
				// the owner of the recorded pid performs the transition.
				if h.state.pid() == Some(pid) {
					h.state = ProcessState::Stopped;
					tracing::warn!(
						"detected process {} with pid {} exited ({}), cleaning up",
						h.name,
						pid,
						status
					);
				}
				return;
			}
			Ok(None) => {}
			Err(e) => {
				tracing::debug!("exit check for pid {} failed, retrying: {}", pid, e);
			}
		}
	}
}

async fn next_line<B: AsyncBufRead + Unpin>(
	stream: &mut Option<Lines<B>>,
) -> std::io::Result<Option<String>> {
	match stream {
		Some(lines) => lines.next_line().await,
		None => std::future::pending().await,
	}
}

/// Pulls whatever buffered output is left after the process exited. The
/// pipes are at end-of-stream, so this completes without blocking.
async fn drain_remaining(
	logs: &mut LogBuffer,
	stdout: &mut Option<StdoutLines>,
	stderr: &mut Option<StderrLines>,
) {
	if let Some(lines) = stdout {
		while let Ok(Some(line)) = lines.next_line().await {
			logs.append(line);
		}
	}
	if let Some(lines) = stderr {
		while let Ok(Some(line)) = lines.next_line().await {
			logs.append(line);
		}
	}
}
