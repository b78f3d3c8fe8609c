use std::sync::Once;

/// How the global logger is set up.
///
/// `filter` takes `env_logger` directives (e.g. "debug",
/// "kiln_gpu=trace,wgpu_core=warn") and wins over `RUST_LOG`. With neither
/// set, kiln logs at `level` and the wgpu/naga internals at `warn`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,

    /// Route output through the test harness capture instead of stderr.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            level: log::LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    /// Captured, debug-level output for integration tests.
    pub fn for_tests() -> Self {
        Self {
            level: log::LevelFilter::Debug,
            is_test: true,
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger on first call; later calls do nothing.
///
/// A logger installed by the host application is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(config.level);
                for noisy in ["wgpu_core", "wgpu_hal", "naga"] {
                    builder.filter_module(noisy, log::LevelFilter::Warn);
                }
            }
        }

        builder.write_style(config.write_style).is_test(config.is_test);

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
