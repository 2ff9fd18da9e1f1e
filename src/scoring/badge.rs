use core::fmt;

use serde::{Deserialize, Serialize};

/// Badge tier floors. Bronze doubles as the zero-state default, so it has
/// no floor of its own; `PLATINUM_CAP` is where progression tops out.
pub const SILVER_FLOOR: i64 = 50;
pub const GOLD_FLOOR: i64 = 100;
pub const PLATINUM_FLOOR: i64 = 200;
pub const PLATINUM_CAP: i64 = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Badge {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Badge::Bronze => "Bronze",
            Badge::Silver => "Silver",
            Badge::Gold => "Gold",
            Badge::Platinum => "Platinum",
        };
        write!(f, "{name}")
    }
}

/// Resolve the badge tier for a cumulative point total.
///
/// Tiers use inclusive lower bounds: a user sitting exactly on a floor
/// already holds that tier.
pub const fn tier_for(points: i64) -> Badge {
    if points >= PLATINUM_FLOOR {
        Badge::Platinum
    } else if points >= GOLD_FLOOR {
        Badge::Gold
    } else if points >= SILVER_FLOOR {
        Badge::Silver
    } else {
        Badge::Bronze
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierProgress {
    pub progress_percent: i64,
    pub next_tier: Option<Badge>,
    pub points_needed: i64,
}

/// Progress toward the next tier boundary, interpolated linearly between
/// the current tier's floor and the next one. Past `PLATINUM_CAP` there is
/// nothing left to chase.
pub fn progress_to_next(points: i64) -> TierProgress {
    let points = points.max(0);

    if points >= PLATINUM_CAP {
        return TierProgress {
            progress_percent: 100,
            next_tier: None,
            points_needed: 0,
        };
    }

    let (floor, ceiling, next_tier) = match tier_for(points) {
        Badge::Bronze => (0, SILVER_FLOOR, Badge::Silver),
        Badge::Silver => (SILVER_FLOOR, GOLD_FLOOR, Badge::Gold),
        Badge::Gold => (GOLD_FLOOR, PLATINUM_FLOOR, Badge::Platinum),
        // within platinum the remaining climb is toward the cap
        Badge::Platinum => (PLATINUM_FLOOR, PLATINUM_CAP, Badge::Platinum),
    };

    TierProgress {
        progress_percent: (points - floor) * 100 / (ceiling - floor),
        next_tier: Some(next_tier),
        points_needed: ceiling - points,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tier_boundaries_match_table() {
        assert_eq!(tier_for(0), Badge::Bronze);
        assert_eq!(tier_for(49), Badge::Bronze);
        assert_eq!(tier_for(50), Badge::Silver);
        assert_eq!(tier_for(99), Badge::Silver);
        assert_eq!(tier_for(100), Badge::Gold);
        assert_eq!(tier_for(199), Badge::Gold);
        assert_eq!(tier_for(200), Badge::Platinum);
        assert_eq!(tier_for(499), Badge::Platinum);
        assert_eq!(tier_for(500), Badge::Platinum);
        assert_eq!(tier_for(100_000), Badge::Platinum);
    }

    #[test]
    fn tier_is_monotonic_in_points() {
        let mut previous = tier_for(0);
        for p in 1..=1_000 {
            let current = tier_for(p);
            assert!(current >= previous, "tier regressed at {p} points");
            previous = current;
        }
    }

    #[test]
    fn progress_interpolates_within_tier() {
        assert_eq!(
            progress_to_next(0),
            TierProgress {
                progress_percent: 0,
                next_tier: Some(Badge::Silver),
                points_needed: 50,
            }
        );
        assert_eq!(
            progress_to_next(25),
            TierProgress {
                progress_percent: 50,
                next_tier: Some(Badge::Silver),
                points_needed: 25,
            }
        );
        assert_eq!(
            progress_to_next(75),
            TierProgress {
                progress_percent: 50,
                next_tier: Some(Badge::Gold),
                points_needed: 25,
            }
        );
        assert_eq!(
            progress_to_next(150),
            TierProgress {
                progress_percent: 50,
                next_tier: Some(Badge::Platinum),
                points_needed: 50,
            }
        );
        assert_eq!(
            progress_to_next(350),
            TierProgress {
                progress_percent: 50,
                next_tier: Some(Badge::Platinum),
                points_needed: 150,
            }
        );
    }

    #[test]
    fn progress_saturates_at_the_cap() {
        for p in [500, 501, 10_000] {
            assert_eq!(
                progress_to_next(p),
                TierProgress {
                    progress_percent: 100,
                    next_tier: None,
                    points_needed: 0,
                }
            );
        }
    }

    #[test]
    fn negative_totals_clamp_to_zero_progress() {
        assert_eq!(progress_to_next(-10).progress_percent, 0);
    }
}
