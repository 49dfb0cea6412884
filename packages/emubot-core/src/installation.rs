//! Waiting for the user to install a package
//!
//! When automation finds a required package missing, [`InstallationWaiter`]
//! blocks the automation thread and hands the UI a "Retry" prompt. Each time
//! the user fires it, the retry runs on the UI's thread, re-checks the
//! package through the [`Controller`], and either releases the waiter or puts
//! the prompt up again. There is no retry limit and no timeout: the wait ends
//! when the package shows up or the process exits.

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::Duration,
};

use emubot_controller::{Controller, PackageName};
use log::{info, trace, warn};

use crate::{
    config::InstallationConfig,
    ui::{Logger, TemporaryAction},
};

/// What the waiter and the retry handler share
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationWaitState {
    pub pending_package: Option<PackageName>,
    pub waiting: bool,
    /// Retries fired since the current wait began
    pub retries: u32,
    /// Bumped by every [`InstallationWaiter::wait_for_installation`]
    pub generation: u64,
}

struct Shared {
    controller: Arc<dyn Controller>,
    logger: Arc<dyn Logger>,
    config: InstallationConfig,
    state: Mutex<InstallationWaitState>,
    released: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, InstallationWaitState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prompt(self: &Arc<Self>, message: String) {
        let handle = RetryHandle {
            shared: Arc::clone(self),
        };
        self.logger.show_temporary_action(TemporaryAction::new(
            message,
            self.config.action_text.as_str(),
            handle,
        ));
    }

    fn retry(self: &Arc<Self>) {
        let (generation, pending) = {
            let mut state = self.lock();
            state.retries += 1;
            (state.generation, state.pending_package.clone())
        };
        let package = pending.clone().unwrap_or_else(|| {
            let package = self.config.default_package();
            warn!("retry fired with no pending package, checking {package}");
            package
        });

        self.logger
            .change_status(&format!("Checking for {package} installation..."));

        let installed = match self.controller.is_package_installed(&package) {
            Ok(installed) => installed,
            Err(err) => {
                warn!("failed to check {package}: {err}");
                self.logger
                    .log(&format!("[!] Failed to check {package}: {err}"));
                false
            }
        };

        // The check ran unlocked; a wait that began meanwhile is not ours to touch.
        {
            let mut state = self.lock();
            if state.generation != generation || state.pending_package != pending {
                info!("ignoring stale retry result for {package}");
                return;
            }
            if installed {
                state.waiting = false;
            }
        }

        if installed {
            self.released.notify_all();
            self.logger
                .change_status("Installation complete - continuing...");
        } else {
            self.prompt(format!(
                "{package} still not found - please install it and complete tutorial"
            ));
            self.logger
                .log(&format!("[!] {package} still not installed. Please try again."));
        }
    }
}

/// The retry handler a [`TemporaryAction`] fires
///
/// Cheap to clone; a UI may keep one around and call [`RetryHandle::retry`]
/// from any thread.
#[derive(Clone)]
pub struct RetryHandle {
    shared: Arc<Shared>,
}

impl RetryHandle {
    /// Re-check the pending package and release the waiter if it is installed,
    /// otherwise show the prompt again.
    pub fn retry(&self) {
        self.shared.retry()
    }

    pub fn state(&self) -> InstallationWaitState {
        self.shared.lock().clone()
    }
}

/// Suspends automation until a package is installed, see the module docs.
pub struct InstallationWaiter {
    shared: Arc<Shared>,
}

impl InstallationWaiter {
    pub fn new(
        controller: Arc<dyn Controller>,
        logger: Arc<dyn Logger>,
        config: InstallationConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                controller,
                logger,
                config,
                state: Mutex::new(InstallationWaitState::default()),
                released: Condvar::new(),
            }),
        }
    }

    pub fn retry_handle(&self) -> RetryHandle {
        RetryHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> InstallationWaitState {
        self.shared.lock().clone()
    }

    pub fn is_waiting(&self) -> bool {
        self.shared.lock().waiting
    }

    pub fn pending_package(&self) -> Option<PackageName> {
        self.shared.lock().pending_package.clone()
    }

    pub fn retry_count(&self) -> u32 {
        self.shared.lock().retries
    }

    pub fn poll_interval(&self) -> Duration {
        self.shared.config.poll_interval()
    }

    /// Block until a retry observes `package` installed, then return `true`.
    ///
    /// Never returns `false` and never gives up; `&mut self` keeps a single
    /// wait active per waiter.
    pub fn wait_for_installation(&mut self, package: &PackageName) -> bool {
        {
            let mut state = self.shared.lock();
            state.pending_package = Some(package.clone());
            state.waiting = true;
            state.retries = 0;
            state.generation += 1;
        }

        self.shared.prompt(format!(
            "{package} not installed - please install it and complete tutorial"
        ));
        self.shared
            .logger
            .log(&format!("[!] {package} not installed."));
        self.shared.logger.log(
            "Please install it in the emulator, complete tutorial, then click Retry in the GUI",
        );
        info!("waiting for {package} to be installed...");

        let poll_interval = self.poll_interval();
        let mut state = self.shared.lock();
        while state.waiting {
            state = match self.shared.released.wait_timeout(state, poll_interval) {
                Ok((state, _)) => state,
                Err(poisoned) => poisoned.into_inner().0,
            };
            trace!("installation wait: waiting = {}", state.waiting);
        }
        state.pending_package = None;
        drop(state);

        self.shared
            .logger
            .log("[+] Installation confirmed, continuing...");
        true
    }

    /// Return right away if `package` is installed, otherwise wait for it.
    ///
    /// A failed check counts as "not installed".
    pub fn ensure_installed(&mut self, package: &PackageName) -> bool {
        match self.shared.controller.is_package_installed(package) {
            Ok(true) => true,
            Ok(false) => self.wait_for_installation(package),
            Err(err) => {
                warn!("failed to check {package}: {err}");
                self.wait_for_installation(package)
            }
        }
    }
}
