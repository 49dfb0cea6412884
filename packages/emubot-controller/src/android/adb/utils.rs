//! Parsing of adb command output

/// Serials listed by `adb devices` whose state is `device`
pub fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Whether `pm list packages <package>` output lists exactly `package`.
///
/// `pm` filters by substring, so `com.example.app` also lists
/// `com.example.app.beta`.
pub fn package_listed(output: &str, package: &str) -> bool {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .any(|name| name == package)
}

pub fn install_succeeded(output: &str) -> bool {
    output.lines().any(|line| line.trim() == "Success")
}

/// `getprop sys.boot_completed` prints `1` once boot finished
pub fn boot_completed(output: &str) -> bool {
    output.trim() == "1"
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_devices() {
        let output = "* daemon started successfully\n\
                      List of devices attached\n\
                      127.0.0.1:16384\tdevice\n\
                      emulator-5554\toffline\n\
                      127.0.0.1:5555\tdevice product:x86 model:MuMu\n\n";
        assert_eq!(
            parse_devices(output),
            vec!["127.0.0.1:16384".to_string(), "127.0.0.1:5555".to_string()]
        );
        assert!(parse_devices("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn test_package_listed() {
        let output = "package:com.example.app.beta\r\npackage:com.example.app\r\n";
        assert!(package_listed(output, "com.example.app"));
        assert!(!package_listed("package:com.example.app.beta\n", "com.example.app"));
        assert!(!package_listed("", "com.example.app"));
    }

    #[test]
    fn test_install_and_boot_output() {
        assert!(install_succeeded("Performing Streamed Install\nSuccess\n"));
        assert!(!install_succeeded(
            "Failure [INSTALL_FAILED_INVALID_APK: not a valid apk]\n"
        ));
        assert!(boot_completed("1\r\n"));
        assert!(!boot_completed("\n"));
    }
}
