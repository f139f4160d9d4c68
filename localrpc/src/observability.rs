//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Observability support for localrpc.
//!
//! Every dispatcher counts its calls and their outcomes in an
//! [`InvocationMetrics`] shared through the [`LocalEnvironment`]. Counters
//! are atomics and can be read at any time; with the `observability` feature
//! enabled they are also exported through the `metrics` crate:
//!
//! - `localrpc.invocations.total`
//! - `localrpc.invocations.succeeded`
//! - `localrpc.failures.declared`
//! - `localrpc.failures.remote`
//! - `localrpc.failures.local_access`
//! - `localrpc.failures.configuration`
//! - `localrpc.failures.codec`
//! - `localrpc.failures.protocol`
//!
//! # Examples
//!
//! ```rust
//! use localrpc::observability::InvocationMetrics;
//! use localrpc::InvocationError;
//!
//! let metrics = InvocationMetrics::new();
//! metrics.record_call();
//! metrics.record_error(&InvocationError::configuration("missing property"));
//!
//! assert_eq!(metrics.total_calls(), 1);
//! assert_eq!(metrics.configuration_failures(), 1);
//! assert_eq!(metrics.total_failures(), 1);
//! ```
//!
//! [`LocalEnvironment`]: crate::LocalEnvironment

use crate::error::InvocationError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Invocation counters.
#[derive(Debug, Default)]
pub struct InvocationMetrics {
    /// Calls started
    calls: AtomicU64,
    /// Calls that returned a value
    successes: AtomicU64,
    /// Calls that returned the service's declared error
    declared_failures: AtomicU64,
    /// Calls that failed on the receiving side with an undeclared failure
    remote_failures: AtomicU64,
    /// Calls whose target was missing from the service directory
    local_access_failures: AtomicU64,
    /// Calls rejected because of missing configuration
    configuration_failures: AtomicU64,
    /// Calls that failed to encode or decode a value
    codec_failures: AtomicU64,
    /// Calls whose record did not match the target method
    protocol_failures: AtomicU64,
}

impl InvocationMetrics {
    /// Creates a new metrics tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a call.
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        ::metrics::counter!("localrpc.invocations.total").increment(1);
    }

    /// Records a call that returned a value.
    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        ::metrics::counter!("localrpc.invocations.succeeded").increment(1);
    }

    /// Records a call that returned the service's declared error.
    pub fn record_declared_failure(&self) {
        self.declared_failures.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        ::metrics::counter!("localrpc.failures.declared").increment(1);
    }

    /// Records an invocation-layer error under its [`FailureKind`].
    ///
    /// [`FailureKind`]: crate::FailureKind
    pub fn record_error(&self, error: &InvocationError) {
        match error {
            InvocationError::Configuration { .. } => {
                self.configuration_failures.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("localrpc.failures.configuration").increment(1);
            }
            InvocationError::LocalServiceAccess { .. } => {
                self.local_access_failures.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("localrpc.failures.local_access").increment(1);
            }
            InvocationError::Remote(_) => {
                self.remote_failures.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("localrpc.failures.remote").increment(1);
            }
            InvocationError::Codec { .. } => {
                self.codec_failures.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("localrpc.failures.codec").increment(1);
            }
            InvocationError::Protocol { .. } => {
                self.protocol_failures.fetch_add(1, Ordering::Relaxed);
                #[cfg(feature = "observability")]
                ::metrics::counter!("localrpc.failures.protocol").increment(1);
            }
        }
    }

    /// Returns the number of calls started.
    #[must_use]
    pub fn total_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Returns the number of calls that returned a value.
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    /// Returns the number of declared failures.
    #[must_use]
    pub fn declared_failures(&self) -> u64 {
        self.declared_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of undeclared failures on the receiving side.
    #[must_use]
    pub fn remote_failures(&self) -> u64 {
        self.remote_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of directory misses.
    #[must_use]
    pub fn local_access_failures(&self) -> u64 {
        self.local_access_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of configuration failures.
    #[must_use]
    pub fn configuration_failures(&self) -> u64 {
        self.configuration_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of codec failures.
    #[must_use]
    pub fn codec_failures(&self) -> u64 {
        self.codec_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of protocol failures.
    #[must_use]
    pub fn protocol_failures(&self) -> u64 {
        self.protocol_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of failed calls of any kind.
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.declared_failures()
            + self.remote_failures()
            + self.local_access_failures()
            + self.configuration_failures()
            + self.codec_failures()
            + self.protocol_failures()
    }
}

/// Logs an invocation-layer error with structured context.
///
/// Local failures (configuration, directory misses) are operator mistakes
/// and logged at `ERROR`; failures raised on the receiving side are logged
/// at `WARN` since the caller receives them as ordinary errors.
pub fn log_error(entry: &str, method: &str, error: &InvocationError) {
    match error {
        InvocationError::Configuration { .. } | InvocationError::LocalServiceAccess { .. } => {
            tracing::error!(
                entry,
                method,
                kind = ?error.kind(),
                error = %error,
                "Local service invocation failed"
            );
        }
        InvocationError::Remote(failure) => {
            tracing::warn!(
                entry,
                method,
                failure_type = failure.type_name(),
                error = %error,
                "Local service raised an undeclared failure"
            );
        }
        InvocationError::Codec { .. } | InvocationError::Protocol { .. } => {
            tracing::warn!(
                entry,
                method,
                kind = ?error.kind(),
                error = %error,
                "Local service invocation record rejected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::RemoteFailure;

    #[test]
    fn test_metrics_default() {
        let metrics = InvocationMetrics::new();
        assert_eq!(metrics.total_calls(), 0);
        assert_eq!(metrics.total_failures(), 0);
    }

    #[test]
    fn test_record_error_by_kind() {
        let metrics = InvocationMetrics::new();
        metrics.record_error(&InvocationError::configuration("x"));
        metrics.record_error(&InvocationError::protocol("x"));
        metrics.record_error(&InvocationError::Remote(RemoteFailure::new("panic", "boom")));
        metrics.record_error(&InvocationError::Codec {
            message: "x".to_string(),
        });
        metrics.record_error(&InvocationError::LocalServiceAccess {
            message: "x".to_string(),
            cause: None,
        });
        metrics.record_declared_failure();

        assert_eq!(metrics.configuration_failures(), 1);
        assert_eq!(metrics.protocol_failures(), 1);
        assert_eq!(metrics.remote_failures(), 1);
        assert_eq!(metrics.codec_failures(), 1);
        assert_eq!(metrics.local_access_failures(), 1);
        assert_eq!(metrics.declared_failures(), 1);
        assert_eq!(metrics.total_failures(), 6);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(InvocationMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_call();
                        metrics.record_success();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.total_calls(), 800);
        assert_eq!(metrics.successes(), 800);
    }

    #[test]
    fn test_log_error() {
        // Exercises every arm without a subscriber installed.
        log_error("core/a", "count", &InvocationError::configuration("x"));
        log_error(
            "core/a",
            "count",
            &InvocationError::Remote(RemoteFailure::new("panic", "boom")),
        );
        log_error("core/a", "count", &InvocationError::protocol("x"));
    }
}
