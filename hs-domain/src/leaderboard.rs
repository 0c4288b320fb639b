use crate::valuation::ComputedHotspot;
use crate::HotspotMetrics;
use itertools::Itertools;
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RankingCriterion {
    /// highest composite score
    Overall,
    /// highest `avgPrice * (1 - priceVolatility)`, ignores the afk factor
    RawMoney,
    /// highest `avgPrice`, ignores volatility and afk factor
    RawMoneyAlternate,
}

impl RankingCriterion {
    pub fn value_of(&self, metrics: &HotspotMetrics) -> f64 {
        match self {
            RankingCriterion::Overall => metrics.score,
            RankingCriterion::RawMoney => metrics.avg_price * (1.0 - metrics.price_volatility),
            RankingCriterion::RawMoneyAlternate => metrics.avg_price,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            RankingCriterion::Overall => "The best hotspot at the moment overall is: ",
            RankingCriterion::RawMoney => "The best hotspot at the moment for money is: ",
            RankingCriterion::RawMoneyAlternate => "An alternative best hotspot at the moment for money is: ",
        }
    }
}

/// Linear scan with a strict greater-than comparison, so the first hotspot in
/// catalog order wins a tie. `None` if there is no candidate.
pub fn find_best(computed: &[ComputedHotspot], criterion: RankingCriterion) -> Option<&ComputedHotspot> {
    let mut best: Option<(&ComputedHotspot, f64)> = None;

    for candidate in computed {
        let value = criterion.value_of(&candidate.metrics);
        if !value.is_finite() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((candidate, value)),
        }
    }

    best.map(|(hotspot, _)| hotspot)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub criterion: RankingCriterion,
    pub best: Option<ComputedHotspot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn compute(computed: &[ComputedHotspot]) -> Self {
        let entries = RankingCriterion::iter()
            .map(|criterion| LeaderboardEntry {
                criterion,
                best: find_best(computed, criterion).cloned(),
            })
            .collect_vec();

        Self { entries }
    }

    pub fn best_for(&self, criterion: RankingCriterion) -> Option<&ComputedHotspot> {
        self.entries
            .iter()
            .find(|entry| entry.criterion == criterion)
            .and_then(|entry| entry.best.as_ref())
    }
}

/// All computed hotspots by descending score. Stable, so ties keep catalog order.
pub fn rank_by_score(computed: &[ComputedHotspot]) -> Vec<&ComputedHotspot> {
    computed
        .iter()
        .sorted_by(|a, b| b.metrics.score.total_cmp(&a.metrics.score))
        .collect_vec()
}
