use std::{
    path::Path,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use image::DynamicImage;

use crate::{
    Controller, ControllerError, Lifecycle, LifecycleOp, LifecycleState, PackageName, Result,
};

/// An in-memory [`Controller`] that tracks its lifecycle and counts stops
#[derive(Default)]
pub struct MockController {
    pub lifecycle: Lifecycle,
    pub stops: AtomicUsize,
    pub fail_stop: AtomicBool,
}

impl MockController {
    pub fn running() -> Self {
        let controller = Self::default();
        controller.create().unwrap();
        controller.start().unwrap();
        controller
    }

    pub fn failing_stop() -> Self {
        let controller = Self::running();
        controller.fail_stop.store(true, Ordering::SeqCst);
        controller
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }
}

impl Controller for MockController {
    fn create(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Create, || Ok(()))
    }

    fn configure(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Configure, || Ok(()))
    }

    fn restart(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Restart, || Ok(()))
    }

    fn start(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Start, || Ok(()))
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(ControllerError::Command {
                command: "stop".to_string(),
                reason: "emulator refused to stop".to_string(),
            });
        }
        self.lifecycle.run(LifecycleOp::Stop, || Ok(()))
    }

    fn click(&self, _x: u32, _y: u32, _clicks: u32, _interval: Duration) -> Result<()> {
        self.lifecycle.check(LifecycleOp::Interact).map(|_| ())
    }

    fn swipe(&self, _x1: u32, _y1: u32, _x2: u32, _y2: u32) -> Result<()> {
        self.lifecycle.check(LifecycleOp::Interact).map(|_| ())
    }

    fn screenshot(&self) -> Result<DynamicImage> {
        self.lifecycle.check(LifecycleOp::Interact)?;
        Ok(DynamicImage::new_rgb8(16, 9))
    }

    fn install_apk(&self, _path: &Path) -> Result<()> {
        Err(ControllerError::Unimplemented {
            backend: "mock",
            capability: "install_apk",
        })
    }

    fn start_app(&self, package: &PackageName) -> Result<()> {
        Err(ControllerError::PackageNotInstalled(package.clone()))
    }

    fn is_package_installed(&self, _package: &PackageName) -> Result<bool> {
        self.lifecycle.check(LifecycleOp::Interact)?;
        Ok(false)
    }
}
