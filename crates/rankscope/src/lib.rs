//! Rankscope core: domain normalization, landing page fetching, heuristic
//! domain rating, paid-metrics lookup and result assembly.

pub mod assemble;
pub mod checker;
pub mod config;
pub mod extract;
pub mod fetcher;
pub mod normalize;
pub mod provider;
pub mod scorer;
pub mod types;

pub use assemble::{assemble, assemble_at, assemble_failure, MetricsSource};
pub use checker::DomainChecker;
pub use config::{BatchConfig, CheckerConfig};
pub use extract::extract_features;
pub use fetcher::{FetchedPage, HttpFetcher, PageSource, ResponseMeta, DEFAULT_USER_AGENT};
pub use normalize::{clean_domain, normalize_domain};
pub use provider::{format_count, MetricsProvider, SerankingProvider, SERANKING_NAME};
pub use scorer::{score, FixedJitter, JitterSource, SeededJitter, ThreadRngJitter};
pub use types::*;
