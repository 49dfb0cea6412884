//! The boundary towards whatever shows logs, status and prompts to the user

use std::fmt::Debug;

use async_channel::{Receiver, Sender};
use log::{error, warn};

use crate::installation::RetryHandle;

/// The UI collaborator.
///
/// Implementations are called from the automation thread and from whatever
/// thread triggers a [`TemporaryAction`], so they must be `Send + Sync`.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
    fn change_status(&self, message: &str);
    /// Present a one-shot prompt; it is dismissed once triggered or replaced.
    fn show_temporary_action(&self, action: TemporaryAction);
}

/// A one-shot prompt with a single action
///
/// Carries an explicit handle to the retry handler it fires.
pub struct TemporaryAction {
    pub message: String,
    pub action_text: String,
    handle: RetryHandle,
}

impl TemporaryAction {
    pub fn new(
        message: impl Into<String>,
        action_text: impl Into<String>,
        handle: RetryHandle,
    ) -> Self {
        Self {
            message: message.into(),
            action_text: action_text.into(),
            handle,
        }
    }

    pub fn handle(&self) -> &RetryHandle {
        &self.handle
    }

    /// Fire the action on the calling thread, consuming the prompt
    pub fn trigger(self) {
        self.handle.retry()
    }
}

impl Debug for TemporaryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryAction")
            .field("message", &self.message)
            .field("action_text", &self.action_text)
            .finish_non_exhaustive()
    }
}

/// 界面事件
///
/// - `Log(String)`: log 信息
/// - `Status(String)`: 状态栏
/// - `Action(TemporaryAction)`: 需要用户触发的临时按钮
#[derive(Debug)]
#[non_exhaustive]
pub enum UiEvent {
    Log(String),
    Status(String),
    Action(TemporaryAction),
}

/// A [`Logger`] that forwards everything as [`UiEvent`]s over a channel,
/// for a UI running its own event loop (sync or async) on the other end.
#[derive(Debug, Clone)]
pub struct ChannelLogger {
    ui_evt_tx: Sender<UiEvent>,
}

impl ChannelLogger {
    pub fn new() -> (Self, Receiver<UiEvent>) {
        let (ui_evt_tx, ui_evt_rx) = async_channel::unbounded();
        (Self { ui_evt_tx }, ui_evt_rx)
    }

    pub fn from_sender(ui_evt_tx: Sender<UiEvent>) -> Self {
        Self { ui_evt_tx }
    }

    fn emit(&self, evt: UiEvent) {
        if let Err(err) = self.ui_evt_tx.try_send(evt) {
            match err.into_inner() {
                UiEvent::Action(action) => {
                    error!("ui is gone, prompt dropped: {}", action.message)
                }
                evt => warn!("ui is gone, event dropped: {:?}", evt),
            }
        }
    }
}

impl Logger for ChannelLogger {
    fn log(&self, message: &str) {
        self.emit(UiEvent::Log(message.to_string()));
    }

    fn change_status(&self, message: &str) {
        self.emit(UiEvent::Status(message.to_string()));
    }

    fn show_temporary_action(&self, action: TemporaryAction) {
        self.emit(UiEvent::Action(action));
    }
}
