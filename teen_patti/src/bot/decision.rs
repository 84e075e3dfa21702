//! Bot decision-making keyed off hand strength.

use crate::game::HandCategory;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

/// What a bot wants to do on its turn. The room actor turns this into a
/// concrete stake using the betting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotDecision {
    Pack,
    Bet,
    DoubleBet,
    Show,
    Sideshow,
}

/// Relative weights of each decision for one strength band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionWeights {
    pub pack: u32,
    pub bet: u32,
    pub double_bet: u32,
    pub show: u32,
    pub sideshow: u32,
}

/// Configuration for bot decision-making.
///
/// Hands are split into three bands by category: weak (high card, pair),
/// medium (color) and strong (sequence and up).
///
/// # Examples
///
/// ```
/// use teen_patti::bot::decision::BotDecisionConfig;
///
/// let config = BotDecisionConfig::default();
/// assert!(config.weak.pack > config.weak.bet);
/// assert!(config.strong.bet > config.strong.pack);
/// ```
#[derive(Debug, Clone)]
pub struct BotDecisionConfig {
    pub weak: DecisionWeights,
    pub medium: DecisionWeights,
    pub strong: DecisionWeights,

    /// Chance per turn that a blind bot looks at its cards first
    pub see_probability: f64,

    /// Chance of accepting a sideshow with a weak hand
    pub weak_accept_probability: f64,

    /// Chance of accepting a sideshow with anything better
    pub strong_accept_probability: f64,
}

impl Default for BotDecisionConfig {
    fn default() -> Self {
        Self {
            weak: DecisionWeights {
                pack: 50,
                bet: 35,
                double_bet: 5,
                show: 5,
                sideshow: 5,
            },
            medium: DecisionWeights {
                pack: 20,
                bet: 50,
                double_bet: 15,
                show: 10,
                sideshow: 5,
            },
            strong: DecisionWeights {
                pack: 5,
                bet: 45,
                double_bet: 30,
                show: 15,
                sideshow: 5,
            },
            see_probability: 0.4,
            weak_accept_probability: 0.3,
            strong_accept_probability: 0.8,
        }
    }
}

/// What the bot can see of the table on its turn
#[derive(Debug, Clone, Copy)]
pub struct BotDecisionContext {
    pub category: HandCategory,
    /// Exactly two players left
    pub can_show: bool,
    /// Bot and previous player have both seen their cards
    pub can_sideshow: bool,
}

/// Bot decision maker
pub struct BotDecisionMaker {
    rng: StdRng,
    config: BotDecisionConfig,
}

impl BotDecisionMaker {
    /// Create a new decision maker with default config
    pub fn new() -> Self {
        Self::with_config(BotDecisionConfig::default())
    }

    /// Create a new decision maker with custom config
    pub fn with_config(config: BotDecisionConfig) -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
            config,
        }
    }

    fn weights_for(&self, category: HandCategory) -> DecisionWeights {
        match category.value() {
            0..=2 => self.config.weak,
            3 => self.config.medium,
            _ => self.config.strong,
        }
    }

    /// Pick an action by weighted random choice. Options the table does not
    /// allow right now are never chosen.
    pub fn decide_action(&mut self, ctx: &BotDecisionContext) -> BotDecision {
        let weights = self.weights_for(ctx.category);
        let options = [
            (BotDecision::Pack, weights.pack),
            (BotDecision::Bet, weights.bet),
            (BotDecision::DoubleBet, weights.double_bet),
            (BotDecision::Show, if ctx.can_show { weights.show } else { 0 }),
            (
                BotDecision::Sideshow,
                if ctx.can_sideshow { weights.sideshow } else { 0 },
            ),
        ];

        options
            .choose_weighted(&mut self.rng, |(_, weight)| *weight)
            .map(|(decision, _)| *decision)
            .unwrap_or(BotDecision::Pack)
    }

    /// Whether a blind bot looks at its cards before acting
    pub fn should_see(&mut self) -> bool {
        self.rng.random_bool(self.config.see_probability)
    }

    /// Whether to accept a sideshow with a hand of `category`
    pub fn accept_sideshow(&mut self, category: HandCategory) -> bool {
        let probability = if category.value() <= 2 {
            self.config.weak_accept_probability
        } else {
            self.config.strong_accept_probability
        };
        self.rng.random_bool(probability)
    }
}

impl Default for BotDecisionMaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tally(maker: &mut BotDecisionMaker, ctx: BotDecisionContext) -> HashMap<BotDecision, u32> {
        let mut counts = HashMap::new();
        for _ in 0..2_000 {
            *counts.entry(maker.decide_action(&ctx)).or_default() += 1;
        }
        counts
    }

    #[test]
    fn test_weak_hands_fold_more_than_strong_hands() {
        let mut maker = BotDecisionMaker::new();
        let weak = tally(
            &mut maker,
            BotDecisionContext {
                category: HandCategory::HighCard,
                can_show: false,
                can_sideshow: false,
            },
        );
        let strong = tally(
            &mut maker,
            BotDecisionContext {
                category: HandCategory::Trail,
                can_show: false,
                can_sideshow: false,
            },
        );

        let packs = |counts: &HashMap<BotDecision, u32>| {
            counts.get(&BotDecision::Pack).copied().unwrap_or(0)
        };
        assert!(packs(&weak) > packs(&strong));
        assert!(strong[&BotDecision::Bet] + strong[&BotDecision::DoubleBet] > 1_000);
    }

    #[test]
    fn test_unavailable_options_are_never_chosen() {
        let mut maker = BotDecisionMaker::new();
        let counts = tally(
            &mut maker,
            BotDecisionContext {
                category: HandCategory::Sequence,
                can_show: false,
                can_sideshow: false,
            },
        );
        assert!(!counts.contains_key(&BotDecision::Show));
        assert!(!counts.contains_key(&BotDecision::Sideshow));
    }

    #[test]
    fn test_certain_probabilities() {
        let mut maker = BotDecisionMaker::with_config(BotDecisionConfig {
            see_probability: 1.0,
            weak_accept_probability: 0.0,
            strong_accept_probability: 1.0,
            ..Default::default()
        });
        assert!(maker.should_see());
        assert!(!maker.accept_sideshow(HandCategory::Pair));
        assert!(maker.accept_sideshow(HandCategory::Color));
    }
}
