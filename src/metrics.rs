//! Metrics for Pyrite
//!
//! Latency histograms recorded through the `metrics` facade, in
//! microseconds. The service observes values between 1 µs and 60 s; two
//! significant digits of precision are sufficient for the exporter's bucket
//! layout.

use metrics::{describe_histogram, histogram, Histogram, Unit};

/// Per-command handling latency, labeled by command name
pub const COMMAND_LATENCY: &str = "pyrite_command_duration_us";

/// Backend flush latency, labeled by block kind (read or write)
pub const FLUSH_LATENCY: &str = "pyrite_flush_duration_us";

/// Latency of calls answered with a failure (unsupported or invalid)
pub const ERROR_LATENCY: &str = "pyrite_error_duration_us";

/// Histogram handles owned by one dispatcher instance
#[derive(Debug, Clone)]
pub struct DispatcherMetrics {
    /// Flush latency of read blocks
    pub read_flush: Histogram,
    /// Flush latency of write blocks
    pub write_flush: Histogram,
    /// Handling latency of erroneous calls
    pub error: Histogram,
}

impl DispatcherMetrics {
    /// Register histogram descriptions and acquire the internal handles
    pub fn new() -> Self {
        describe_histogram!(
            COMMAND_LATENCY,
            Unit::Microseconds,
            "Microseconds spent handling one command, by command name"
        );
        describe_histogram!(
            FLUSH_LATENCY,
            Unit::Microseconds,
            "Microseconds from block creation to backend flush completion"
        );
        describe_histogram!(
            ERROR_LATENCY,
            Unit::Microseconds,
            "Microseconds spent handling unsupported or invalid calls"
        );
        Self {
            read_flush: histogram!(FLUSH_LATENCY, "kind" => "read"),
            write_flush: histogram!(FLUSH_LATENCY, "kind" => "write"),
            error: histogram!(ERROR_LATENCY),
        }
    }

    /// The latency histogram handle for one registered command
    pub fn command(name: &'static str) -> Histogram {
        histogram!(COMMAND_LATENCY, "command" => name)
    }
}

impl Default for DispatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}
