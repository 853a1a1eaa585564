/// Streak lengths that trigger a celebration, ascending.
pub const MILESTONES: [u32; 7] = [7, 30, 50, 100, 365, 500, 1000];

/// Smallest fixed milestone above `current`; past the last one, the next
/// multiple of one hundred.
pub fn next_milestone(current: u32) -> u32 {
    MILESTONES
        .iter()
        .copied()
        .find(|milestone| current < *milestone)
        .unwrap_or_else(|| current.saturating_add(1).div_ceil(100).saturating_mul(100))
}

/// Percent of the way from the previous milestone (or zero) to the next.
pub fn progress_percent(current: u32) -> f64 {
    let next = next_milestone(current);
    let previous = if current >= MILESTONES[0] {
        MILESTONES
            .iter()
            .rev()
            .copied()
            .find(|milestone| *milestone < next)
            .unwrap_or(0)
    } else {
        0
    };

    let span = f64::from(next.saturating_sub(previous).max(1));
    let covered = f64::from(current) - f64::from(previous);
    (covered / span * 100.0).clamp(0.0, 100.0)
}

/// Whether `streak` is exactly one of the fixed milestones.
pub fn is_exact_milestone(streak: u32) -> bool {
    MILESTONES.contains(&streak)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_milestone_boundaries() {
        assert_eq!(next_milestone(0), 7);
        assert_eq!(next_milestone(6), 7);
        assert_eq!(next_milestone(7), 30);
        assert_eq!(next_milestone(49), 50);
        assert_eq!(next_milestone(999), 1000);
        assert_eq!(next_milestone(1000), 1100);
        assert_eq!(next_milestone(1150), 1200);
    }

    #[test]
    fn only_fixed_values_are_exact() {
        assert!(is_exact_milestone(7));
        assert!(is_exact_milestone(1000));
        assert!(!is_exact_milestone(8));
        assert!(!is_exact_milestone(1100));
        assert!(!is_exact_milestone(0));
    }

    #[test]
    fn progress_interpolates_between_milestones() {
        assert_eq!(progress_percent(0), 0.0);
        assert!((progress_percent(3) - 300.0 / 7.0).abs() < 1e-9);
        assert_eq!(progress_percent(7), 0.0);
        assert!((progress_percent(18) - 11.0 / 23.0 * 100.0).abs() < 1e-9);
        assert_eq!(progress_percent(40), 50.0);
        assert_eq!(progress_percent(1050), 50.0);
    }

    #[test]
    fn progress_stays_in_range() {
        for streak in 0..1500 {
            let percent = progress_percent(streak);
            assert!((0.0..=100.0).contains(&percent), "{streak} -> {percent}");
        }
    }
}
