use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Sliding-window limiter keyed by client address.
///
/// Clients whose window has fully expired are swept at most once per window,
/// so the map only holds clients seen within roughly the last two windows.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    state: Arc<Mutex<LimiterState>>,
    window: Duration,
    max_requests: usize,
}

#[derive(Debug)]
struct LimiterState {
    hits: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LimiterState {
                hits: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            window,
            max_requests: max_requests.max(1),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    pub fn tracked_clients(&self) -> usize {
        self.state.lock().hits.len()
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut state = self.state.lock();

        if now.saturating_duration_since(state.last_sweep) >= self.window {
            let window = self.window;
            state.hits.retain(|_, queue| {
                prune(queue, now, window);
                !queue.is_empty()
            });
            state.last_sweep = now;
        }

        let queue = state.hits.entry(client.to_string()).or_default();
        prune(queue, now, self.window);

        if queue.len() >= self.max_requests {
            let oldest = queue.front().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return RateDecision::Limited { retry_after };
        }

        queue.push_back(now);
        RateDecision::Allowed
    }
}

fn prune(queue: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while queue
        .front()
        .is_some_and(|oldest| now.saturating_duration_since(*oldest) > window)
    {
        queue.pop_front();
    }
}
