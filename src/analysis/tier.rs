use crate::types::Tier;

/// Number of named tiers; clustering caps k here so every rank has a name.
pub const MAX_TIERS: usize = 4;

/// Converts a cluster rank (0 = best mean transit score) into its tier name.
///
/// | Rank | Tier      |
/// |------|-----------|
/// | 0    | excellent |
/// | 1    | good      |
/// | 2    | moderate  |
/// | 3    | poor      |
///
/// Ranks beyond the table have no name and return `None`.
pub fn tier_for_rank(rank: usize) -> Option<Tier> {
    match rank {
        0 => Some(Tier::Excellent),
        1 => Some(Tier::Good),
        2 => Some(Tier::Moderate),
        3 => Some(Tier::Poor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_table() {
        assert_eq!(tier_for_rank(0), Some(Tier::Excellent));
        assert_eq!(tier_for_rank(1), Some(Tier::Good));
        assert_eq!(tier_for_rank(2), Some(Tier::Moderate));
        assert_eq!(tier_for_rank(3), Some(Tier::Poor));
        assert_eq!(tier_for_rank(4), None);
    }

    #[test]
    fn test_every_rank_below_cap_has_a_name() {
        for rank in 0..MAX_TIERS {
            assert!(tier_for_rank(rank).is_some());
        }
    }
}
