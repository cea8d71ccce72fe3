use std::sync::Once;

/// Filter used when neither `env_filter` nor `RUST_LOG` is set.
///
/// wgpu's internals log heavily at info; keep them at warn.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "prism_engine=debug,wgpu_core=warn").
///
/// `write_style` controls ANSI coloring behavior.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Filter to install: explicit config, then `rust_log`, then [`DEFAULT_FILTER`].
    fn resolve_filter(&self, rust_log: Option<String>) -> String {
        self.env_filter
            .clone()
            .or(rust_log)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

/// Most verbose level any directive in `filter` enables.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn max_level(filter: &str) -> log::LevelFilter {
    env_logger::Builder::new().parse_filters(filter).build().filter()
}

#[cfg(not(target_arch = "wasm32"))]
fn install(config: &LoggingConfig, filter: &str) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filter);
    builder.write_style(config.write_style);
    builder.try_init()
}

/// Browsers have no stderr; records and panics go to the devtools console.
#[cfg(target_arch = "wasm32")]
fn install(_config: &LoggingConfig, filter: &str) -> Result<(), log::SetLoggerError> {
    console_error_panic_hook::set_once();
    let level = max_level(filter).to_level().unwrap_or(log::Level::Error);
    console_log::init_with_level(level)
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolve_filter(std::env::var("RUST_LOG").ok());

        if let Err(e) = install(&config, &filter) {
            eprintln!("logger already installed: {e}");
            return;
        }

        log::debug!("logging initialized with filter {filter:?}");
    });
}
