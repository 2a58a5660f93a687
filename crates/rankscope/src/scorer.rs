//! Heuristic domain rating.
//!
//! Fixed additive rules over page features and load speed. The estimates
//! for backlinks and referring domains carry a random jitter term, drawn
//! from an injectable [`JitterSource`] so tests can pin it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::types::{Confidence, HeuristicScore, PageFeatures, SpeedClass, TechFeatures};

const BASE_RATING: i32 = 20;
const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 100;

/// Traffic string used when nothing is known about the page.
pub const UNKNOWN_TRAFFIC: &str = "Est: 1K-5K/month";

/// Source of the non-deterministic terms in the estimates.
pub trait JitterSource: Send + Sync {
    /// A uniformly distributed integer in `[0, upper)`; `0` when `upper` is `0`.
    fn next_below(&self, upper: u64) -> u64;
}

/// Thread-local RNG. The production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn next_below(&self, upper: u64) -> u64 {
        if upper == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Reproducible jitter from a fixed seed.
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn next_below(&self, upper: u64) -> u64 {
        if upper == 0 {
            return 0;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..upper),
            Err(poisoned) => poisoned.into_inner().gen_range(0..upper),
        }
    }
}

/// Always returns the same value, capped below `upper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub u64);

impl JitterSource for FixedJitter {
    fn next_below(&self, upper: u64) -> u64 {
        if upper == 0 {
            return 0;
        }
        self.0.min(upper - 1)
    }
}

/// Score a domain.
///
/// With `features` absent (the page could not be fetched) every number is
/// a random placeholder and the score is marked [`Confidence::Degraded`].
pub fn score(
    features: Option<&PageFeatures>,
    tech: Option<&TechFeatures>,
    jitter: &dyn JitterSource,
) -> HeuristicScore {
    let page_speed = tech.map(|t| t.speed_class).unwrap_or(SpeedClass::Unknown);

    match features {
        Some(f) => HeuristicScore {
            domain_rating: domain_rating(f, tech),
            backlinks: estimate_backlinks(f) + jitter.next_below(500),
            referring_domains: estimate_referring_domains(f) + jitter.next_below(50),
            organic_traffic: estimate_traffic(f),
            page_speed,
            confidence: Confidence::Estimated,
        },
        None => HeuristicScore {
            domain_rating: (10 + jitter.next_below(30)) as u8,
            backlinks: 100 + jitter.next_below(1000),
            referring_domains: 20 + jitter.next_below(100),
            organic_traffic: UNKNOWN_TRAFFIC.to_string(),
            page_speed,
            confidence: Confidence::Degraded,
        },
    }
}

/// Deterministic 1–100 rating from page signals and load speed.
pub fn domain_rating(f: &PageFeatures, tech: Option<&TechFeatures>) -> u8 {
    let mut rating = BASE_RATING;

    if f.has_ssl {
        rating += 15;
    }

    // Content quality
    if title_len(f) > 10 {
        rating += 10;
    }
    if f.meta_description.as_deref().map_or(0, |d| d.chars().count()) > 50 {
        rating += 10;
    }
    if f.h1_count.unwrap_or(0) > 0 {
        rating += 5;
    }
    if f.h2_count.unwrap_or(0) > 0 {
        rating += 5;
    }

    // Content size
    if f.content_length > 10_000 {
        rating += 10;
    } else if f.content_length > 5_000 {
        rating += 5;
    }

    // Link structure
    if f.link_count > 10 {
        rating += 5;
    }
    if f.link_count > 50 {
        rating += 5;
    }

    match tech.map(|t| t.speed_class) {
        Some(SpeedClass::Fast) => rating += 10,
        Some(SpeedClass::Medium) => rating += 5,
        _ => {}
    }

    // Large, link-heavy pages tend to belong to established sites
    if f.content_length > 20_000 && f.link_count > 100 {
        rating += 10;
    }

    clamp_rating(rating)
}

fn clamp_rating(raw: i32) -> u8 {
    raw.clamp(MIN_RATING, MAX_RATING) as u8
}

fn title_len(f: &PageFeatures) -> usize {
    f.title.chars().count()
}

/// Backlink estimate before jitter.
fn estimate_backlinks(f: &PageFeatures) -> u64 {
    let mut backlinks = 50;
    if f.content_length > 10_000 {
        backlinks += 500;
    }
    if f.link_count > 50 {
        backlinks += 200;
    }
    if f.has_ssl {
        backlinks += 300;
    }
    if title_len(f) > 30 {
        backlinks += 150;
    }
    backlinks
}

/// Referring-domain estimate before jitter.
fn estimate_referring_domains(f: &PageFeatures) -> u64 {
    let mut domains = 10;
    if f.content_length > 15_000 {
        domains += 50;
    }
    if f.link_count > 100 {
        domains += 30;
    }
    if f.has_ssl {
        domains += 20;
    }
    domains
}

/// Monthly traffic range, e.g. `Est: 3K-4K/month`.
fn estimate_traffic(f: &PageFeatures) -> String {
    let mut traffic: u64 = 1000;
    if f.content_length > 20_000 {
        traffic += 5000;
    }
    if f.link_count > 100 {
        traffic += 3000;
    }
    if f.has_ssl {
        traffic += 2000;
    }

    let min = traffic / 1000;
    let max = traffic * 3 / 2 / 1000;
    format!("Est: {min}K-{max}K/month")
}
