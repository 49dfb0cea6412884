//! A terminal stand-in for the GUI: prints [`UiEvent`]s as they arrive and
//! fires the latest prompt's action when the user presses Enter.

use std::{
    io::{self, BufRead, Write},
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
};

use async_channel::Receiver;
use color_print::cwriteln;
use emubot_core::{TemporaryAction, UiEvent};
use tracing::{info, warn};

/// The prompt Enter would fire, replaced by every new prompt
type PendingAction = Arc<Mutex<Option<TemporaryAction>>>;

pub fn spawn(ui_evt_rx: Receiver<UiEvent>) -> io::Result<JoinHandle<()>> {
    let pending = PendingAction::default();
    {
        let pending = Arc::clone(&pending);
        thread::Builder::new()
            .name("console-stdin".to_string())
            .spawn(move || read_stdin(pending))?;
    }
    thread::Builder::new()
        .name("console-ui".to_string())
        .spawn(move || run(ui_evt_rx, pending))
}

fn run(ui_evt_rx: Receiver<UiEvent>, pending: PendingAction) {
    while let Ok(evt) = ui_evt_rx.recv_blocking() {
        if let Err(err) = render(evt, &mut io::stdout().lock(), &pending) {
            warn!("failed to write to the console: {err}");
            break;
        }
    }
    info!("console ui stopped");
}

fn render(evt: UiEvent, out: &mut impl Write, pending: &PendingAction) -> io::Result<()> {
    match evt {
        UiEvent::Log(msg) => writeln!(out, "{msg}")?,
        UiEvent::Status(msg) => cwriteln!(out, "<dim>[status]</dim> {msg}")?,
        UiEvent::Action(action) => {
            cwriteln!(out, "<yellow><strong>{}</strong></yellow>", action.message)?;
            cwriteln!(out, "press <strong>Enter</strong> to {}", action.action_text)?;
            *lock(pending) = Some(action);
        }
        _ => {}
    }
    out.flush()
}

fn read_stdin(pending: PendingAction) {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => {
                warn!("stdin closed, prompts can no longer be answered");
                return;
            }
            Ok(_) => {}
        }
        let action = lock(&pending).take();
        match action {
            Some(action) => action.trigger(),
            None => info!("nothing to answer right now"),
        }
    }
}

fn lock(pending: &PendingAction) -> MutexGuard<'_, Option<TemporaryAction>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
