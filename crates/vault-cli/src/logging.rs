//! Log filter for the CLI's stderr subscriber

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set and valid, otherwise `warn` (or `debug` with `-v`)
pub fn env_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("warning: ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e),
        }
    }

    EnvFilter::new(if verbose { "debug" } else { "warn" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_levels() {
        assert_eq!(env_filter(false, None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(env_filter(true, None).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(env_filter(false, Some("")).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_rust_log_overrides_both_levels() {
        assert_eq!(env_filter(false, Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(env_filter(true, Some("error")).max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_invalid_rust_log_falls_back() {
        assert_eq!(
            env_filter(false, Some("vault_core=notalevel")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }
}
