use std::process::{Command, Stdio};
pub mod encoder;
pub mod probe;

/// Checks that an external binary can be executed at all.
pub fn is_installed(binary: &str, version_arg: &str) -> bool {
    let cmd = Command::new(binary)
        .arg(version_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match cmd {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}
