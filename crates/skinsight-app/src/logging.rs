//! 로깅 초기화.

use skinsight_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// tracing 구독자 설치. `RUST_LOG`가 있으면 우선, 없으면 설정 필터
///
/// 이미 전역 구독자가 설치되어 있으면 `false`.
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter)),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let config = LoggingConfig::default();
        let _ = init(&config);
        assert!(!init(&config));
    }
}
