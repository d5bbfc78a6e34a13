use std::time::{Duration, Instant};

/// Turns the configured run duration into a deadline that virtual users check between
/// iterations.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started: Instant,
    planned_runtime: Duration,
    deadline: Option<Instant>,
}

impl RunClock {
    pub fn start(planned_runtime: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            planned_runtime,
            // A duration too large to represent as an instant never expires.
            deadline: started.checked_add(planned_runtime),
        }
    }

    pub fn planned_runtime(&self) -> Duration {
        self.planned_runtime
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}
