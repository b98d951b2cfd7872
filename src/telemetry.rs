use flapper_core::config::TelemetryConfig;
use flapper_core::telemetry::{NullTelemetry, TelemetrySink};
use flapper_io::SqliteTelemetry;
use std::sync::Arc;

/// The SQLite sink when telemetry is enabled, otherwise a sink that drops everything.
pub fn open_telemetry(config: &TelemetryConfig) -> Arc<dyn TelemetrySink> {
    if !config.enabled {
        tracing::info!("Telemetry disabled");
        return Arc::new(NullTelemetry);
    }
    Arc::new(SqliteTelemetry::open(&config.database_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_telemetry_is_null() {
        let config = TelemetryConfig {
            enabled: false,
            ..TelemetryConfig::default()
        };
        let sink = open_telemetry(&config);
        assert!(!sink.is_degraded());
    }

    #[test]
    fn test_enabled_telemetry_opens_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = TelemetryConfig {
            enabled: true,
            database_path: dir.path().join("t.db"),
            record_actions: true,
        };
        let sink = open_telemetry(&config);
        assert!(!sink.is_degraded());
        sink.flush();
        assert!(dir.path().join("t.db").exists());
    }
}
