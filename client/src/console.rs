use std::sync::Arc;

use futures_signals::signal::SignalExt;
use futures_signals::signal_vec::SignalVecExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use shared::types::Note;

use crate::app::NotesApp;
use crate::error::AppError;
use crate::utils::preview;

const PREVIEW_WIDTH: usize = 60;

static HELP_SIGNED_OUT: &'static str = "login <email> | verify <email> <code> | link <token_hash> | quit";
static HELP_SIGNED_IN: &'static str = "<text> adds a note | rm <n> | ls | reload | logout | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Verify { email: String, code: String },
    Link(String),
    Add(String),
    Remove(usize),
    List,
    Reload,
    Logout,
    Quit,
    Help,
    Empty,
}

impl Command {
    /// Signed out, only the sign-in affordance is offered; anything else is
    /// answered with the help line. Signed in, unknown input is note text.
    pub fn parse(line: &str, signed_in: bool) -> Command {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let args = words.collect::<Vec<_>>();

        match (head, args.as_slice(), signed_in) {
            ("quit" | "exit", [], _) => Command::Quit,
            ("help", [], _) => Command::Help,
            ("login", [email], false) => Command::Login(email.to_string()),
            ("verify", [email, code], false) => Command::Verify { email: email.to_string(), code: code.to_string() },
            ("link", [token_hash], false) => Command::Link(token_hash.to_string()),
            (_, _, false) => Command::Help,
            ("rm", [n], true) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Remove(n),
                _ => Command::Help,
            },
            ("ls", [], true) => Command::List,
            ("reload", [], true) => Command::Reload,
            ("logout", [], true) => Command::Logout,
            _ => Command::Add(line.to_string()),
        }
    }
}

pub fn render(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "  (no notes)".to_string();
    }
    notes.iter()
        .enumerate()
        .map(|(n, note)| format!(
            "{:>3}. {}  ({})",
            n + 1,
            preview(&note.content, PREVIEW_WIDTH),
            note.inserted_at.format("%Y-%m-%d %H:%M")
        ))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs one command. Returns `false` when the console should stop.
pub async fn execute(app: &NotesApp, command: Command) -> Result<bool, AppError> {
    match command {
        Command::Empty => {}
        Command::Quit => return Ok(false),
        Command::Help => {
            let help = if app.tracker.current_session().is_some() { HELP_SIGNED_IN } else { HELP_SIGNED_OUT };
            println!("{help}");
        }
        Command::Login(email) => app.tracker.sign_in(&email).await?,
        Command::Verify { email, code } => app.tracker.verify(&email, &code).await?,
        Command::Link(token_hash) => app.tracker.verify_link(&token_hash).await?,
        Command::Logout => app.tracker.sign_out().await?,
        Command::Add(text) => {
            app.state.draft.set(text);
            app.sync.submit().await?;
        }
        Command::Remove(n) => {
            let id = app.state.notes.lock_ref().get(n - 1).map(|note| note.id);
            match id {
                Some(id) => app.sync.remove(id).await?,
                None => println!("no note #{n}"),
            }
        }
        Command::List => println!("{}", render(&app.state.notes())),
        Command::Reload => {
            app.sync.load().await;
        }
    }
    Ok(true)
}

fn spawn_renderers(app: &Arc<NotesApp>) -> Vec<JoinHandle<()>> {
    let state = app.state.clone();
    let greeter = tokio::spawn(app.tracker.signal().for_each(|session| {
        match session {
            Some(session) => println!("signed in as {}\n{HELP_SIGNED_IN}", session.email()),
            None => println!("signed out\n{HELP_SIGNED_OUT}"),
        }
        async {}
    }));

    let list = tokio::spawn(state.notes.signal_vec_cloned().to_signal_cloned().for_each(|notes| {
        println!("{}", render(&notes));
        async {}
    }));

    let alert_state = app.state.clone();
    let alerts = tokio::spawn(state.alerts.signal_vec_cloned().len().for_each(move |len| {
        if len > 0 {
            for alert in alert_state.take_alerts() {
                println!("!! {alert}");
            }
        }
        async {}
    }));

    vec![greeter, list, alerts]
}

/// Failed deletes are already reported through the alert queue.
fn reportable(err: AppError, removing: bool) -> Option<AppError> {
    match err {
        AppError::Write(_) if removing => None,
        err => Some(err),
    }
}

/// Line-oriented front end over stdin/stdout until `quit` or end of input.
pub async fn run_console(app: Arc<NotesApp>) {
    let renderers = spawn_renderers(&app);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::error!("stdin: {err}");
                break;
            }
        };
        let signed_in = app.tracker.current_session().is_some();
        let command = Command::parse(&line, signed_in);
        let removing = matches!(command, Command::Remove(_));
        match execute(&app, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => {
                if let Some(err) = reportable(err, removing) {
                    println!("error: {err}");
                }
            }
        }
    }

    for renderer in renderers {
        renderer.abort();
    }
}
