//! Standard locations for crossdeck configuration files

use std::path::PathBuf;

/// Per-user configuration directory
///
/// Returns: `<platform config dir>/crossdeck` (e.g. `~/.config/crossdeck`),
/// or `./crossdeck` when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crossdeck")
}

/// Path of `filename` inside [`default_config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_crossdeck() {
        assert!(default_config_dir().ends_with("crossdeck"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("engine.yaml");
        assert!(path.ends_with("crossdeck/engine.yaml"));
    }
}
