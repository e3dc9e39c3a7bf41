use std::path::PathBuf;

pub const DEFAULT_SOURCE_EXT: &str = "das";
pub const DEFAULT_BINARY_EXT: &str = "dcb";

pub fn default_suite_dir() -> PathBuf {
    PathBuf::from("suites")
}
