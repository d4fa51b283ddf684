use std::time::Duration;

use serde::Serialize;

/// Statistics for one bootstrap refresh
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootstrapStats {
    pub definition_count: usize,
    pub extension_count: usize,
    pub interceptor_count: usize,
    pub singleton_count: usize,
    pub total_time: Duration,
    pub post_processing_time: Duration,
    pub interceptor_registration_time: Duration,
    pub instantiation_time: Duration,
}

impl BootstrapStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the percentage of time spent on each phase
    pub fn phase_percentages(&self) -> PhasePercentages {
        let total_micros = self.total_time.as_micros() as f64;

        if total_micros == 0.0 {
            return PhasePercentages::default();
        }

        PhasePercentages {
            post_processing: (self.post_processing_time.as_micros() as f64 / total_micros) * 100.0,
            interceptor_registration: (self.interceptor_registration_time.as_micros() as f64
                / total_micros)
                * 100.0,
            instantiation: (self.instantiation_time.as_micros() as f64 / total_micros) * 100.0,
        }
    }

    /// Log the summary at info level
    pub fn log_summary(&self) {
        tracing::info!("=== Bootstrap Summary ===");
        tracing::info!("Definitions: {}", self.definition_count);
        tracing::info!("Extensions invoked: {}", self.extension_count);
        tracing::info!("Interceptors: {}", self.interceptor_count);
        tracing::info!("Singletons pre-instantiated: {}", self.singleton_count);
        tracing::info!("Total time: {:?}", self.total_time);
        tracing::info!("  - Post-processing: {:?}", self.post_processing_time);
        tracing::info!("  - Interceptor registration: {:?}", self.interceptor_registration_time);
        tracing::info!("  - Instantiation: {:?}", self.instantiation_time);
    }
}

/// Phase percentages for bootstrap stats
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhasePercentages {
    pub post_processing: f64,
    pub interceptor_registration: f64,
    pub instantiation: f64,
}
