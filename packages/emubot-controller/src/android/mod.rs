//! Android emulators driven through the `adb` binary

pub mod adb;
pub mod impls;

pub use impls::adb_controller::AdbController;
