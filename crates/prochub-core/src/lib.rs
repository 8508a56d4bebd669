//! # prochub-core
//!
//! Process supervision engine: a registry of named external processes with
//! start/stop lifecycle control, bounded per-process output capture, and a
//! poller task per running process that drains output and detects exit.
//!
//! The catalog of definitions can be reloaded at runtime;
//! [`Supervisor::reconcile`] applies a new [`Catalog`] to the managed set
//! without disturbing processes whose names survive the reload.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use prochub_core::{Catalog, ProcessDef, Supervisor};
//! use std::collections::BTreeMap;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut definitions = BTreeMap::new();
//! definitions.insert(
//!     "web".to_string(),
//!     ProcessDef {
//!         dir: "/srv/web".into(),
//!         command: vec!["python3".into(), "-m".into(), "http.server".into()],
//!     },
//! );
//!
//! let supervisor = Supervisor::new();
//! supervisor.reconcile(&Catalog { definitions }).await;
//! supervisor.start("web").await.unwrap();
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod logs;
pub mod proctree;
pub mod supervisor;
pub mod types;

pub use catalog::{Catalog, CatalogError};
pub use error::SupervisorError;
pub use logs::{LogBuffer, MAX_LOG_LINES};
pub use supervisor::{ProcessHandle, Supervisor};
pub use types::{ProcessDef, ProcessSnapshot, ProcessState};
