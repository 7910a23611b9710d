//! Progress arithmetic shared by the engine and the coordinator

use serde::Serialize;
use std::time::Duration;

/// Point-in-time view of a running job
///
/// Recomputed on every tick from either source; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProgressSnapshot {
    /// Last percentage reported by the workload itself
    pub reported_percent: u8,
    /// Percentage estimated from wall time against the nominal duration
    pub estimated_percent: u8,
    /// Time since the job started
    pub elapsed: Duration,
}

/// Percentage reported after finishing increment `increment` (zero-based) of `total`
///
/// Integer division, so intermediate values are not evenly spaced for
/// durations that do not divide 100.
pub fn percent_after(increment: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (u64::from(increment) + 1) * 100 / u64::from(total);
    percent.min(100) as u8
}

/// Wall-clock estimate: `min(100, elapsed / nominal * 100)`
pub fn estimate_percent(elapsed: Duration, nominal: Duration) -> u8 {
    if nominal.is_zero() {
        return 100;
    }
    let percent = elapsed.as_micros() * 100 / nominal.as_micros().max(1);
    percent.min(100) as u8
}

/// Formats an elapsed duration as `hh:mm:ss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_after_uses_integer_division() {
        let thirty: Vec<u8> = (0..30).map(|i| percent_after(i, 30)).collect();
        assert_eq!(&thirty[..4], &[3, 6, 10, 13]);
        assert_eq!(thirty[29], 100);

        let ten: Vec<u8> = (0..10).map(|i| percent_after(i, 10)).collect();
        assert_eq!(ten, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_estimate_is_capped() {
        let nominal = Duration::from_secs(10);
        assert_eq!(estimate_percent(Duration::ZERO, nominal), 0);
        assert_eq!(estimate_percent(Duration::from_secs(3), nominal), 30);
        assert_eq!(estimate_percent(Duration::from_millis(4500), nominal), 45);
        assert_eq!(estimate_percent(Duration::from_secs(25), nominal), 100);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "00:01:05");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "01:02:03");
    }
}
