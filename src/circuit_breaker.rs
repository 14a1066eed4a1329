use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{Config, StateMachine};
use std::time::Duration;

/// Circuit breaker type guarding the report service.
pub type ReportCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates a circuit breaker for report service calls.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, requests pass through.
/// - **OPEN**: Too many failures, requests fail fast without touching the network.
/// - **HALF_OPEN**: Testing if service recovered.
///
/// The breaker never retries; each trigger is still at most one request.
pub fn create_report_circuit_breaker() -> ReportCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn test_circuit_breaker_opens_after_failures() {
        let cb = create_report_circuit_breaker();

        for _ in 0..5 {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("simulated error"));
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));
        match result {
            Err(Error::Rejected) => {}
            _ => panic!("Expected circuit to be open and reject requests"),
        }
    }

    #[test]
    fn test_single_failure_keeps_circuit_closed() {
        let cb = create_report_circuit_breaker();

        let _: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("simulated error"));
        let result: Result<i32, Error<&str>> = cb.call(|| Ok::<i32, &str>(42));

        assert_eq!(result.unwrap(), 42);
    }
}
