// Karma and sustainability bookkeeping.

use serde::{Deserialize, Serialize};

use crate::models::{ListingType, User};

pub const STARTING_KARMA: i64 = 100;
pub const NOTE_SHARE_REWARD: i64 = 25;

/// Post-deal feedback left for a trading partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Positive,
    Neutral,
    Negative,
}

impl Feedback {
    pub fn karma_delta(&self) -> i64 {
        match self {
            Feedback::Positive => 10,
            Feedback::Neutral => 0,
            Feedback::Negative => -10,
        }
    }
}

/// Reward for completing a trade: (karma, kg CO2 saved). Rentals and free
/// items complete when they are returned.
pub fn completion_reward(listing_type: ListingType) -> (i64, f64) {
    match listing_type {
        ListingType::Sell => (10, 2.5),
        ListingType::Rent | ListingType::Free => (15, 1.2),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Rookie,
    Pro,
    Legendary,
}

impl Rank {
    pub fn for_karma(karma: i64) -> Self {
        if karma >= 150 {
            Rank::Legendary
        } else if karma >= 50 {
            Rank::Pro
        } else {
            Rank::Rookie
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Rookie => "Rookie Engineer",
            Rank::Pro => "Pro Engineer",
            Rank::Legendary => "Legendary Engineer",
        }
    }
}

/// Return a copy of `user` with karma and carbon adjusted. Karma is allowed
/// to go negative.
pub fn adjusted(user: &User, karma_delta: i64, carbon_delta: f64) -> User {
    User {
        karma: user.karma.saturating_add(karma_delta),
        total_carbon_saved: user.total_carbon_saved + carbon_delta,
        ..user.clone()
    }
}
