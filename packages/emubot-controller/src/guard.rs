use std::ops::{Deref, DerefMut};

use color_print::cprintln;
use log::warn;

use crate::{Controller, Result};

/// Owns a [`Controller`] for the lifetime of an automation session.
///
/// When dropped (normal return, early `?` return or unwinding) it stops the
/// controller unless auto-stop was switched off. Errors from that stop are
/// logged and discarded: a release path never fails.
pub struct ControllerGuard<C: Controller> {
    controller: C,
    auto_stop_on_drop: bool,
}

impl<C: Controller> ControllerGuard<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            auto_stop_on_drop: true,
        }
    }

    pub fn without_auto_stop(controller: C) -> Self {
        Self {
            controller,
            auto_stop_on_drop: false,
        }
    }

    pub fn set_auto_stop(&mut self, auto_stop: bool) {
        self.auto_stop_on_drop = auto_stop;
    }

    pub fn auto_stop(&self) -> bool {
        self.auto_stop_on_drop
    }

    /// Stop explicitly, surfacing the error instead of swallowing it.
    pub fn shutdown(mut self) -> Result<()> {
        self.auto_stop_on_drop = false;
        self.controller.stop()
    }
}

impl<C: Controller> Deref for ControllerGuard<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl<C: Controller> DerefMut for ControllerGuard<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.controller
    }
}

impl<C: Controller> Drop for ControllerGuard<C> {
    fn drop(&mut self) {
        if !self.auto_stop_on_drop {
            return;
        }
        cprintln!("<blue>[ControllerGuard]</blue>: stopping controller on release...");
        if let Err(err) = self.controller.stop() {
            warn!("failed to stop controller on release: {err}");
        }
    }
}
