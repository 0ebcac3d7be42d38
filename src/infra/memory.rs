use std::fs;

/// Cooperative soft memory ceiling checked by long-running searches.
#[derive(Debug, Clone, Copy)]
pub struct MemoryGuard {
    max_mb: f64,
}

impl MemoryGuard {
    pub fn new(max_mb: f64) -> Self {
        Self { max_mb }
    }

    pub fn max_mb(&self) -> f64 {
        self.max_mb
    }

    /// Resident set size of this process in MB, 0 when it cannot be sampled.
    pub fn usage_mb(&self) -> f64 {
        resident_kb().map_or(0.0, |kb| kb as f64 / 1024.0)
    }

    /// Returns the sampled usage when it exceeds the ceiling.
    pub fn exceeded(&self) -> Option<f64> {
        let used = self.usage_mb();
        (used > self.max_mb).then_some(used)
    }
}

fn resident_kb() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generous_limit_is_not_exceeded() {
        let guard = MemoryGuard::new(1_000_000.0);
        assert!(guard.exceeded().is_none());
        assert!(guard.usage_mb() >= 0.0);
    }

    #[test]
    fn test_negative_limit_trips_when_sampling_works() {
        let guard = MemoryGuard::new(-1.0);
        if guard.usage_mb() > 0.0 {
            assert!(guard.exceeded().is_some());
        }
    }
}
