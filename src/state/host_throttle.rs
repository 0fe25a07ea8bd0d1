use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks the request timeline of one host during a crawl run
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests granted to this host in the current run
    pub request_count: u32,

    /// Instant at which the most recently granted request may start
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next request slot for this host
    ///
    /// The slot is `now` if the host has been quiet for at least `delay`,
    /// otherwise exactly `delay` after the previously reserved slot. Reserving
    /// moves the host's timeline forward, so two callers never receive slots
    /// closer together than `delay`.
    pub fn reserve(&mut self, now: Instant, delay: Duration) -> Instant {
        let slot = match self.last_request_time {
            Some(last) => std::cmp::max(now, last + delay),
            None => now,
        };
        self.request_count += 1;
        self.last_request_time = Some(slot);
        slot
    }
}

/// Per-host request spacing for one crawl run
///
/// Requests to the same host are spaced by that host's delay; requests to
/// distinct hosts never wait on each other.
#[derive(Debug, Default)]
pub struct HostThrottle {
    hosts: Mutex<HashMap<String, DomainState>>,
}

impl HostThrottle {
    /// Creates an empty throttle
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot for `host` and returns how long the caller must wait for it
    pub fn reserve(&self, host: &str, delay: Duration) -> Duration {
        let now = Instant::now();
        let slot = match self.hosts.lock() {
            Ok(mut hosts) => hosts
                .entry(host.to_string())
                .or_insert_with(DomainState::new)
                .reserve(now, delay),
            // A poisoned map only loses spacing history; fall back to the full delay
            Err(_) => now + delay,
        };
        slot.saturating_duration_since(now)
    }

    /// Waits until `host` may receive its next request
    pub async fn wait_turn(&self, host: &str, delay: Duration) {
        let wait = self.reserve(host, delay);
        if !wait.is_zero() {
            tracing::trace!("Throttling {} for {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_is_immediate() {
        let mut state = DomainState::new();
        let now = Instant::now();
        assert_eq!(state.reserve(now, Duration::from_secs(1)), now);
        assert_eq!(state.request_count, 1);
    }

    #[test]
    fn test_consecutive_reservations_are_spaced() {
        let mut state = DomainState::new();
        let now = Instant::now();
        let delay = Duration::from_millis(500);

        let first = state.reserve(now, delay);
        let second = state.reserve(now, delay);
        let third = state.reserve(now, delay);

        assert_eq!(second - first, delay);
        assert_eq!(third - second, delay);
    }

    #[test]
    fn test_quiet_host_does_not_wait() {
        let mut state = DomainState::new();
        let start = Instant::now();
        let delay = Duration::from_millis(100);

        state.reserve(start, delay);
        let later = start + Duration::from_secs(5);
        assert_eq!(state.reserve(later, delay), later);
    }

    #[test]
    fn test_throttle_hosts_are_independent() {
        let throttle = HostThrottle::new();
        let delay = Duration::from_secs(10);

        assert!(throttle.reserve("a.test", delay).is_zero());
        assert!(throttle.reserve("b.test", delay).is_zero());
        assert!(throttle.reserve("a.test", delay) > Duration::from_secs(9));
        assert!(throttle.reserve("c.test", delay).is_zero());
    }

    #[test]
    fn test_zero_delay_never_waits() {
        let throttle = HostThrottle::new();
        for _ in 0..5 {
            assert!(throttle.reserve("a.test", Duration::ZERO).is_zero());
        }
    }
}
