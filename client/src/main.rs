use std::sync::Arc;

use tracing_subscriber::fmt::format::FmtSpan;

use crate::app::NotesApp;
use crate::config::ClientConfig;
use crate::connect_auth::SupabaseAuth;
use crate::connect_http::SupabaseHttp;
use crate::connect_realtime::SupabaseRealtime;
use crate::connect_rest::SupabaseNotes;
use crate::console::run_console;
use crate::constants::{HEARTBEAT_INTERVAL, REFRESH_CHECK_INTERVAL};
use crate::storage::SessionStore;
use crate::tasks::run_tasks;

mod app;
mod config;
mod connect_auth;
mod connect_http;
mod connect_realtime;
mod connect_rest;
mod console;
mod constants;
mod error;
mod gateway;
mod notes;
mod session;
mod state;
mod storage;
mod tasks;
mod types;
mod utils;
#[cfg(test)]
mod testing;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let with_ansi = cfg!(target_os = "macos");

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_ansi(with_ansi)
        .with_max_level(config.log_level())
        .with_thread_ids(true)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("logging: {err}");
    }

    let http = SupabaseHttp::new(&config);
    let app = NotesApp::new(
        Arc::new(SupabaseAuth::new(http.clone())),
        Arc::new(SupabaseNotes::new(http.clone())),
        Arc::new(SupabaseRealtime::new(&http, HEARTBEAT_INTERVAL)),
        config.session_file.clone().map(SessionStore::new),
    );

    app.tracker.restore().await;
    app.mount();

    tokio::task::spawn(run_tasks(Arc::downgrade(&app), REFRESH_CHECK_INTERVAL));

    run_console(app.clone()).await;
    app.shutdown();
    tracing::info!("bye");
}
