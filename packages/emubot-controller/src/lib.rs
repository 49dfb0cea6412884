//! emubot-controller contains the contract every emulator backend fulfils:
//! lifecycle (create, configure, start, stop), touch input, screencap and
//! package management, plus the pieces shared by all backends.
//!
//! - [`Controller`]: the capability set
//! - [`Lifecycle`]: the lifecycle state machine backends embed
//! - [`ControllerGuard`]: owns a controller and stops it when dropped
//! - [`build_controller`]: picks a backend from a [`ControllerConfig`]

use std::{fmt::Display, path::Path, sync::Arc, time::Duration};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

#[cfg(feature = "android")]
pub mod android;
pub mod backend;
pub mod error;
pub mod guard;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{build_controller, BackendKind, ControllerConfig};
pub use error::{ControllerError, Result};
pub use guard::ControllerGuard;
pub use lifecycle::{Lifecycle, LifecycleOp, LifecycleState};

/// Identifier of an installable application, e.g. `com.supercell.clashroyale`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Wrap `name` as is; backends reject malformed names before using them.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Wrap `name` if it is a well-formed package name, see [`PackageName::is_valid`].
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = Self(name.into());
        if !name.is_valid() {
            return Err(ControllerError::InvalidPackageName(name.0));
        }
        Ok(name)
    }

    /// Dot-separated, non-empty segments of `[A-Za-z0-9_]`.
    ///
    /// Anything else could change the meaning of a device shell command.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.split('.').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PackageName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// [`Controller`] 承担着设备操作相关的事情，如生命周期、触控、截图、应用管理
///
/// Every backend implements the whole capability set, so a backend missing
/// one of them does not compile. A backend that knows at runtime it cannot
/// serve a capability returns [`ControllerError::Unimplemented`].
///
/// All methods take `&self`: a controller is shared between the automation
/// thread and whoever checks on it (e.g. a UI retry action), so backends keep
/// their mutable state behind locks.
pub trait Controller: Send + Sync {
    // MARK: Lifecycle

    /// Bring the emulator instance into existence (or attach to it).
    fn create(&self) -> Result<()>;
    /// Apply resolution/density and other instance settings.
    fn configure(&self) -> Result<()>;
    fn restart(&self) -> Result<()>;
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;

    // MARK: Interaction

    /// Tap `clicks` times at `(x, y)`, waiting `interval` between taps.
    ///
    /// Coordinates are pixels of the current screenshot.
    fn click(&self, x: u32, y: u32, clicks: u32, interval: Duration) -> Result<()>;

    fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<()>;

    /// Get the most recent frame, decoded
    fn screenshot(&self) -> Result<DynamicImage>;

    // MARK: App management

    fn install_apk(&self, path: &Path) -> Result<()>;
    fn start_app(&self, package: &PackageName) -> Result<()>;
    /// Pure query, bounded by the backend's command timeout.
    fn is_package_installed(&self, package: &PackageName) -> Result<bool>;

    // MARK: Has default implementation

    /// A single tap
    fn tap(&self, x: u32, y: u32) -> Result<()> {
        self.click(x, y, 1, Duration::ZERO)
    }
}

macro_rules! forward_controller {
    ($ty:ty) => {
        impl<C: Controller + ?Sized> Controller for $ty {
            fn create(&self) -> Result<()> {
                (**self).create()
            }
            fn configure(&self) -> Result<()> {
                (**self).configure()
            }
            fn restart(&self) -> Result<()> {
                (**self).restart()
            }
            fn start(&self) -> Result<()> {
                (**self).start()
            }
            fn stop(&self) -> Result<()> {
                (**self).stop()
            }
            fn click(&self, x: u32, y: u32, clicks: u32, interval: Duration) -> Result<()> {
                (**self).click(x, y, clicks, interval)
            }
            fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<()> {
                (**self).swipe(x1, y1, x2, y2)
            }
            fn screenshot(&self) -> Result<DynamicImage> {
                (**self).screenshot()
            }
            fn install_apk(&self, path: &Path) -> Result<()> {
                (**self).install_apk(path)
            }
            fn start_app(&self, package: &PackageName) -> Result<()> {
                (**self).start_app(package)
            }
            fn is_package_installed(&self, package: &PackageName) -> Result<bool> {
                (**self).is_package_installed(package)
            }
        }
    };
}

forward_controller!(Box<C>);
forward_controller!(Arc<C>);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_package_name_validation() {
        for name in ["com.supercell.clashroyale", "com.example.app_2", "settings"] {
            assert!(PackageName::parse(name).is_ok(), "{name}");
        }
        for name in [
            "",
            "foo;reboot",
            "com.example.app && rm -rf /data",
            "com..example",
            ".com.example",
            "com.example.",
            "com.example app",
            "$(reboot)",
        ] {
            assert!(
                matches!(
                    PackageName::parse(name),
                    Err(ControllerError::InvalidPackageName(rejected)) if rejected == name
                ),
                "{name}"
            );
        }
        assert!(!PackageName::new("foo;reboot").is_valid());
    }
}
