//! emubot-core drives an emulator [`Controller`] on behalf of automation
//! code: configuration, the UI boundary, and the installation wait that
//! suspends automation until the user has installed a required package.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use emubot_core::{
//!     build_controller, AppConfig, ChannelLogger, Controller, InstallationWaiter, PackageName,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = AppConfig::load("emubot.toml")?;
//! let controller: Arc<dyn Controller> = Arc::from(build_controller(&config.controller)?);
//! let (logger, ui_evt_rx) = ChannelLogger::new();
//! // hand `ui_evt_rx` to the UI, which triggers the prompts it receives
//! # drop(ui_evt_rx);
//! let mut waiter = InstallationWaiter::new(controller, Arc::new(logger), config.installation);
//! waiter.ensure_installed(&PackageName::new("com.supercell.clashroyale"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod installation;
pub mod ui;

pub use emubot_controller::{
    build_controller, Controller, ControllerConfig, ControllerError, ControllerGuard,
    PackageName,
};

pub use config::{AppConfig, InstallationConfig};
pub use installation::{InstallationWaitState, InstallationWaiter, RetryHandle};
pub use ui::{ChannelLogger, Logger, TemporaryAction, UiEvent};
