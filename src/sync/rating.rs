//! Derived player rating: upstream rating blended with community votes.

use crate::storage::queries::CommunityRating;

/// Community votes needed before they influence the display rating.
pub const MIN_COMMUNITY_VOTES: u32 = 3;
/// Share of the upstream rating in the blend.
pub const API_WEIGHT: f64 = 0.6;
pub const NEUTRAL_RATING: f64 = 6.0;
pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingPolicy {
    pub min_votes: u32,
    pub api_weight: f64,
    pub neutral: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            min_votes: MIN_COMMUNITY_VOTES,
            api_weight: API_WEIGHT,
            neutral: NEUTRAL_RATING,
            min: RATING_MIN,
            max: RATING_MAX,
        }
    }
}

impl RatingPolicy {
    pub fn clamp(&self, rating: f64) -> f64 {
        if rating.is_nan() {
            return self.neutral;
        }
        rating.clamp(self.min, self.max)
    }

    /// Display rating for one player.
    ///
    /// With enough community votes the result is
    /// `api * api_weight + community * (1 - api_weight)`, or the community
    /// average alone when there is no upstream rating. Below the vote
    /// threshold the upstream rating is used as-is, falling back to the
    /// neutral default.
    pub fn blend(&self, api: Option<f64>, community: Option<CommunityRating>) -> f64 {
        let community = community
            .filter(|c| c.votes >= self.min_votes)
            .map(|c| c.average);
        let raw = match (api, community) {
            (Some(api), Some(avg)) => api * self.api_weight + avg * (1.0 - self.api_weight),
            (None, Some(avg)) => avg,
            (Some(api), None) => api,
            (None, None) => self.neutral,
        };
        self.clamp(raw)
    }
}
