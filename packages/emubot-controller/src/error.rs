use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{LifecycleOp, LifecycleState, PackageName};

pub type Result<T, E = ControllerError> = std::result::Result<T, E>;

/// Errors raised by a [`crate::Controller`].
#[derive(Error, Debug)]
pub enum ControllerError {
    /// The backend cannot serve this capability at all.
    #[error("{backend} backend does not implement `{capability}`")]
    Unimplemented {
        backend: &'static str,
        capability: &'static str,
    },

    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("cannot {op} while the controller is {state}")]
    InvalidLifecycle {
        op: LifecycleOp,
        state: LifecycleState,
    },

    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("command `{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode screenshot: {0}")]
    Image(#[from] image::ImageError),

    #[error("apk not found: {}", .0.display())]
    ApkNotFound(PathBuf),

    #[error("package rejected by the backend: {0}")]
    InstallRejected(String),

    #[error("invalid package name: {0:?}")]
    InvalidPackageName(String),

    #[error("package {0} is not installed")]
    PackageNotInstalled(PackageName),
}
