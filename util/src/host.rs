//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the software root.
pub const SW_ROOT_ENV_VAR: &str = "EXO_SW_ROOT";

/// Get the software root directory.
///
/// This is the value of `EXO_SW_ROOT` if set, otherwise the current working
/// directory, so that `./log` and `./params` resolve the way an operator
/// launching from the install directory expects.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match env::var_os(SW_ROOT_ENV_VAR) {
        Some(root) => Ok(PathBuf::from(root)),
        None => env::current_dir()
    }
}

/// Short description of the platform this executable was built for.
pub fn describe() -> String {
    format!("{} ({}, {})", env::consts::OS, env::consts::ARCH, env::consts::FAMILY)
}
