//! CLI subcommand implementations.

pub mod diagnose;
pub mod import;
pub mod reconcile;
pub mod serve;

use std::path::{Path, PathBuf};

use supplyrecon_lib::ReconConfig;

/// Database path precedence: `--db` flag, then the resolved config (which
/// already carries any `SUPPLYRECON_DB` override).
pub fn resolve_db_path(flag: Option<&Path>, config: &ReconConfig) -> PathBuf {
    flag.map(Path::to_path_buf)
        .unwrap_or_else(|| config.store.path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_config_path() {
        let config = ReconConfig::default();
        assert_eq!(
            resolve_db_path(Some(Path::new("/tmp/other.db")), &config),
            PathBuf::from("/tmp/other.db")
        );
        assert_eq!(resolve_db_path(None, &config), config.store.path);
    }
}
