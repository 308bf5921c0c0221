use env_logger::{Builder, Env};

/// Installs `env_logger`. `RUST_LOG` wins; otherwise `--verbose` picks debug over info.
pub fn init_logging(verbose: bool) {
    Builder::from_env(Env::default().default_filter_or(default_filter(verbose)))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}
