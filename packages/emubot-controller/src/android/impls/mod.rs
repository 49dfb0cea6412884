pub mod adb_controller;
