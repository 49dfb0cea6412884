use std::{
    path::Path,
    thread::sleep,
    time::{Duration, Instant},
};

use color_print::cprintln;
use image::{DynamicImage, ImageFormat};
use log::{info, trace};

use crate::{
    android::adb::{utils, Adb},
    Controller, ControllerConfig, ControllerError, Lifecycle, LifecycleOp, LifecycleState,
    PackageName, Result,
};

const BOOT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// An implementation of [`crate::Controller`]
///
/// This attaches to an already installed emulator and uses pure adb
/// commands for input, screencap and package management.
pub struct AdbController {
    adb: Adb,
    config: ControllerConfig,
    lifecycle: Lifecycle,
}

impl AdbController {
    pub fn new(config: ControllerConfig) -> Self {
        let adb = Adb::new(&config.adb_path, &config.serial, config.command_timeout());
        Self {
            adb,
            config,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn serial(&self) -> &str {
        self.adb.serial()
    }

    fn connect(&self) -> Result<()> {
        let serial = self.adb.serial();
        cprintln!("<blue>[AdbController]</blue>: connecting to {serial}...");
        self.adb.execute_host_command(&["connect", serial])?;

        let devices = self.adb.execute_host_command(&["devices"])?;
        let devices = utils::parse_devices(&String::from_utf8_lossy(&devices));
        if !devices.iter().any(|device| device == serial) {
            return Err(ControllerError::Command {
                command: format!("adb connect {serial}"),
                reason: format!("{serial} is not listed by `adb devices`: {devices:?}"),
            });
        }
        cprintln!("<blue>[AdbController]</blue>: connected");
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        let serial = self.adb.serial();
        cprintln!("<blue>[AdbController]</blue>: disconnecting from {serial}...");
        self.adb.execute_host_command(&["disconnect", serial])?;
        Ok(())
    }

    fn wait_for_boot(&self) -> Result<()> {
        self.adb.execute_command(&["wait-for-device"])?;

        let timeout = self.config.boot_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            let res = self.adb.shell("getprop sys.boot_completed")?;
            if utils::boot_completed(&res) {
                info!("{} finished booting", self.adb.serial());
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ControllerError::Timeout {
                    command: "getprop sys.boot_completed".to_string(),
                    timeout,
                });
            }
            trace!("waiting for {} to boot...", self.adb.serial());
            sleep(BOOT_POLL_INTERVAL);
        }
    }

    fn ensure_running(&self) -> Result<()> {
        self.lifecycle.check(LifecycleOp::Interact).map(|_| ())
    }
}

impl Controller for AdbController {
    fn create(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Create, || self.connect())
    }

    fn configure(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Configure, || {
            let (width, height, density) =
                (self.config.width, self.config.height, self.config.density);
            cprintln!(
                "<blue>[AdbController]</blue>: configuring {}x{} @ {} dpi",
                width,
                height,
                density
            );
            self.adb.shell(&format!("wm size {width}x{height}"))?;
            self.adb.shell(&format!("wm density {density}"))?;
            Ok(())
        })
    }

    fn restart(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Restart, || {
            if self.state() == LifecycleState::Running {
                self.disconnect()?;
            }
            self.connect()?;
            self.wait_for_boot()
        })
    }

    fn start(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Start, || {
            if self.state() == LifecycleState::Stopped {
                self.connect()?;
            }
            self.wait_for_boot()
        })
    }

    fn stop(&self) -> Result<()> {
        self.lifecycle.run(LifecycleOp::Stop, || self.disconnect())
    }

    fn click(&self, x: u32, y: u32, clicks: u32, interval: Duration) -> Result<()> {
        self.ensure_running()?;
        cprintln!(
            "<blue>[AdbController]</blue>: clicking ({}, {}) x{} using adb",
            x,
            y,
            clicks
        );
        for i in 0..clicks {
            self.adb.shell(&format!("input tap {x} {y}"))?;
            if i + 1 < clicks {
                sleep(interval);
            }
        }
        Ok(())
    }

    fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<()> {
        self.ensure_running()?;
        let duration = self.config.swipe_duration();
        cprintln!(
            "<blue>[AdbController]</blue>: swiping from {:?} to {:?} for {:?} using adb",
            (x1, y1),
            (x2, y2),
            duration
        );
        self.adb.shell(&format!(
            "input swipe {x1} {y1} {x2} {y2} {}",
            duration.as_millis()
        ))?;
        Ok(())
    }

    fn screenshot(&self) -> Result<DynamicImage> {
        self.ensure_running()?;
        let bytes = self.adb.execute_command(&["exec-out", "screencap", "-p"])?;
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
        Ok(image)
    }

    fn install_apk(&self, path: &Path) -> Result<()> {
        self.ensure_running()?;
        if !path.is_file() {
            return Err(ControllerError::ApkNotFound(path.to_path_buf()));
        }
        cprintln!(
            "<blue>[AdbController]</blue>: installing {}...",
            path.display()
        );
        let path = path.to_string_lossy();
        let output = self.adb.execute_command(&["install", "-r", &*path])?;
        let output = String::from_utf8_lossy(&output);
        if !utils::install_succeeded(&output) {
            return Err(ControllerError::InstallRejected(output.trim().to_string()));
        }
        Ok(())
    }

    fn start_app(&self, package: &PackageName) -> Result<()> {
        check_package_name(package)?;
        if !self.is_package_installed(package)? {
            return Err(ControllerError::PackageNotInstalled(package.clone()));
        }
        cprintln!("<blue>[AdbController]</blue>: starting {package}...");
        self.adb.shell(&format!(
            "monkey -p {package} -c android.intent.category.LAUNCHER 1"
        ))?;
        Ok(())
    }

    fn is_package_installed(&self, package: &PackageName) -> Result<bool> {
        check_package_name(package)?;
        self.ensure_running()?;
        let output = self.adb.shell(&format!("pm list packages {package}"))?;
        Ok(utils::package_listed(&output, package.as_str()))
    }
}

/// Package names are interpolated into `adb shell` command lines.
fn check_package_name(package: &PackageName) -> Result<()> {
    if !package.is_valid() {
        return Err(ControllerError::InvalidPackageName(package.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn controller() -> AdbController {
        AdbController::new(ControllerConfig {
            adb_path: "/nonexistent/adb".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_lifecycle_before_create_is_rejected() {
        let controller = controller();
        for res in [controller.configure(), controller.start(), controller.stop()] {
            assert!(matches!(
                res,
                Err(ControllerError::InvalidLifecycle {
                    state: LifecycleState::Uncreated,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_interaction_requires_running() {
        let controller = controller();
        let package = PackageName::new("com.example.app");
        assert!(controller.tap(1, 1).is_err());
        assert!(controller.swipe(0, 0, 10, 10).is_err());
        assert!(controller.screenshot().is_err());
        assert!(controller.is_package_installed(&package).is_err());
        assert!(controller.start_app(&package).is_err());
        assert!(controller
            .install_apk(Path::new("/nonexistent/app.apk"))
            .is_err());
        assert_eq!(controller.state(), LifecycleState::Uncreated);
    }

    #[test]
    fn test_create_fails_without_adb() {
        let controller = controller();
        assert!(matches!(
            controller.create(),
            Err(ControllerError::Command { .. })
        ));
        assert_eq!(controller.state(), LifecycleState::Uncreated);
    }

    #[test]
    fn test_malformed_package_name_is_rejected_before_running() {
        let controller = controller();
        for res in [
            controller.is_package_installed(&PackageName::new("foo;reboot")),
            controller
                .start_app(&PackageName::new("com.example.app && reboot"))
                .map(|_| true),
        ] {
            assert!(matches!(res, Err(ControllerError::InvalidPackageName(_))));
        }
    }

    /// Writes an `adb` stand-in that appends its arguments to `calls.log`.
    #[cfg(unix)]
    fn fake_adb(name: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("emubot-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let log = dir.join("calls.log");
        let _ = std::fs::remove_file(&log);
        let script = dir.join("adb");
        std::fs::write(
            &script,
            format!(
                r#"#!/bin/sh
echo "$@" >> "{log}"
case "$*" in
  devices) printf 'List of devices attached\n127.0.0.1:16384\tdevice\n' ;;
  *getprop*) echo 1 ;;
  *"pm list packages com.example.app") echo package:com.example.app ;;
esac
"#,
                log = log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (script, log)
    }

    #[cfg(unix)]
    #[test]
    fn test_malformed_package_name_never_reaches_the_shell() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (adb_path, log) = fake_adb("package-name");
        let controller = AdbController::new(ControllerConfig {
            adb_path,
            ..Default::default()
        });
        controller.create().unwrap();
        controller.start().unwrap();

        assert!(controller
            .is_package_installed(&PackageName::new("com.example.app"))
            .unwrap());
        assert!(matches!(
            controller.is_package_installed(&PackageName::new("foo;reboot")),
            Err(ControllerError::InvalidPackageName(name)) if name == "foo;reboot"
        ));
        assert!(matches!(
            controller.start_app(&PackageName::new("$(reboot)")),
            Err(ControllerError::InvalidPackageName(_))
        ));

        let calls = std::fs::read_to_string(&log).unwrap();
        assert!(calls.contains("pm list packages com.example.app"), "{calls}");
        assert!(!calls.contains("reboot"), "{calls}");
        assert!(!calls.contains("monkey"), "{calls}");
        controller.stop().unwrap();
    }

    #[test]
    #[ignore = "needs an emulator listening on 127.0.0.1:16384"]
    fn test_emulator_session() {
        let controller = AdbController::new(ControllerConfig::default());
        controller.create().unwrap();
        controller.start().unwrap();
        let screen = controller.screenshot().unwrap();
        println!("screen: {}x{}", screen.width(), screen.height());
        controller
            .is_package_installed(&PackageName::new("com.android.settings"))
            .unwrap();
        controller.stop().unwrap();
    }
}
