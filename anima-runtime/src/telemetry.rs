//! Tracing bootstrap.

use tracing_subscriber::EnvFilter;

use anima_core::config::GeneralConfig;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `general.log_level` applies to the
/// anima crates. Returns `false` when a subscriber was already installed.
pub fn init_tracing(general: &GeneralConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &general.log_level;
        EnvFilter::new(format!(
            "warn,anima_core={level},anima_llm={level},anima_runtime={level}"
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    let installed = if general.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_not_an_error() {
        let general = GeneralConfig::default();
        let _ = init_tracing(&general);
        assert!(!init_tracing(&general));
    }
}
