mod api;

use std::path::PathBuf;
use std::sync::Arc;

use prochub_core::{Catalog, Supervisor};

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt().init();

	let mut host = "0.0.0.0".to_string();
	let mut port: u16 = 5005;
	let mut catalog_path = PathBuf::from("processes.json");

	let args: Vec<String> = std::env::args().skip(1).collect();
	let mut iter = args.iter();
	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"--host" | "-o" => {
				if let Some(value) = iter.next() {
					host = value.clone();
				}
			}
			"--port" | "-p" => {
				port = match iter.next().map(|v| v.parse()) {
					Some(Ok(value)) => value,
					_ => {
						eprintln!("--port expects a number");
						std::process::exit(2);
					}
				};
			}
			"--catalog" | "-c" => {
				if let Some(value) = iter.next() {
					catalog_path = PathBuf::from(value);
				}
			}
			other => {
				eprintln!("unknown argument: {}", other);
				eprintln!("usage: prochub-daemon [--host HOST] [--port PORT] [--catalog FILE]");
				std::process::exit(2);
			}
		}
	}

	let catalog = match Catalog::load(&catalog_path) {
		Ok(catalog) => catalog,
		Err(e) => {
			tracing::error!("failed to load catalog {}: {}", catalog_path.display(), e);
			std::process::exit(1);
		}
	};

	let supervisor = Supervisor::new();
	supervisor.reconcile(&catalog).await;

	let app = api::router(Arc::clone(&supervisor), catalog_path);
	let addr = format!("{}:{}", host, port);
	let listener = match tokio::net::TcpListener::bind(&addr).await {
		Ok(listener) => listener,
		Err(e) => {
			tracing::error!("failed to bind {}: {}", addr, e);
			std::process::exit(1);
		}
	};
	tracing::info!("listening on {}", addr);

	let server = tokio::spawn(async move {
		if let Err(e) = axum::serve(listener, app).await {
			tracing::error!("server error: {}", e);
		}
	});

	tokio::select! {
		_ = server => {}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("shutting down");
		}
	}
}
