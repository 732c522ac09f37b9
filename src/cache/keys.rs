//! Cache key namespacing and TTL policy
//!
//! Every key is `"<category prefix>:<parts>"`. The category is fixed when the
//! key is built, so layer routing (skip-L1) and default TTL never depend on
//! parsing the string back.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Namespace of cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    Market,
    User,
    Challenge,
    Session,
    Forex,
    News,
    Signals,
    Calendar,
    #[serde(rename = "ratelimit")]
    RateLimit,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 9] = [
        Self::Market,
        Self::User,
        Self::Challenge,
        Self::Session,
        Self::Forex,
        Self::News,
        Self::Signals,
        Self::Calendar,
        Self::RateLimit,
    ];

    /// Key prefix (and configuration name) of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::User => "user",
            Self::Challenge => "challenge",
            Self::Session => "session",
            Self::Forex => "forex",
            Self::News => "news",
            Self::Signals => "signals",
            Self::Calendar => "calendar",
            Self::RateLimit => "ratelimit",
        }
    }

    /// Built-in TTL before configuration overrides
    pub fn default_ttl(&self) -> Duration {
        let seconds = match self {
            Self::Market => 5,
            Self::Forex | Self::Challenge | Self::RateLimit => 60,
            Self::Signals => 120,
            Self::News | Self::User => 300,
            Self::Calendar => 900,
            Self::Session => 86_400,
        };
        Duration::from_secs(seconds)
    }

    /// Sessions and rate-limit counters must be consistent across replicas,
    /// so they are never served from a per-process L1 copy.
    pub fn skips_l1(&self) -> bool {
        matches!(self, Self::Session | Self::RateLimit)
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(Self::Market),
            "user" => Ok(Self::User),
            "challenge" => Ok(Self::Challenge),
            "session" => Ok(Self::Session),
            "forex" => Ok(Self::Forex),
            "news" => Ok(Self::News),
            "signals" => Ok(Self::Signals),
            "calendar" => Ok(Self::Calendar),
            "ratelimit" | "rate_limit" => Ok(Self::RateLimit),
            other => Err(format!("unknown cache category: {other}")),
        }
    }
}

/// A namespaced cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    category: Option<CacheCategory>,
    key: String,
}

impl CacheKey {
    /// Key under `category`: `"<prefix>:<suffix>"`
    pub fn new(category: CacheCategory, suffix: impl AsRef<str>) -> Self {
        Self {
            category: Some(category),
            key: format!("{}:{}", category.as_str(), suffix.as_ref()),
        }
    }

    /// Un-namespaced key; uses the configured default TTL and is L1-eligible
    pub fn raw(key: impl Into<String>) -> Self {
        Self {
            category: None,
            key: key.into(),
        }
    }

    pub fn market(suffix: impl AsRef<str>) -> Self {
        Self::new(CacheCategory::Market, suffix)
    }

    /// `market:quote:<SYMBOL>`; symbols are upper-cased
    pub fn market_quote(symbol: &str) -> Self {
        Self::new(
            CacheCategory::Market,
            format!("quote:{}", symbol.to_ascii_uppercase()),
        )
    }

    /// `user:<id>:<resource>`
    pub fn user(user_id: impl fmt::Display, resource: &str) -> Self {
        Self::new(CacheCategory::User, format!("{user_id}:{resource}"))
    }

    /// Prefix covering every key of one user (for `delete_pattern`)
    pub fn user_prefix(user_id: impl fmt::Display) -> String {
        format!("{}:{user_id}:", CacheCategory::User.as_str())
    }

    pub fn challenge(suffix: impl AsRef<str>) -> Self {
        Self::new(CacheCategory::Challenge, suffix)
    }

    pub fn session(session_id: impl AsRef<str>) -> Self {
        Self::new(CacheCategory::Session, session_id)
    }

    /// `forex:<PAIR>`; pairs are upper-cased
    pub fn forex(pair: &str) -> Self {
        Self::new(CacheCategory::Forex, pair.to_ascii_uppercase())
    }

    pub fn news(suffix: impl AsRef<str>) -> Self {
        Self::new(CacheCategory::News, suffix)
    }

    pub fn signals(suffix: impl AsRef<str>) -> Self {
        Self::new(CacheCategory::Signals, suffix)
    }

    pub fn calendar(suffix: impl AsRef<str>) -> Self {
        Self::new(CacheCategory::Calendar, suffix)
    }

    /// `ratelimit:<subject>:<window>`
    pub fn rate_limit(subject: impl fmt::Display, window: &str) -> Self {
        Self::new(CacheCategory::RateLimit, format!("{subject}:{window}"))
    }

    /// Prefix covering a whole category
    pub fn category_prefix(category: CacheCategory) -> String {
        format!("{}:", category.as_str())
    }

    pub fn category(&self) -> Option<CacheCategory> {
        self.category
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn skips_l1(&self) -> bool {
        self.category.is_some_and(|c| c.skips_l1())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

/// Category TTL table with configuration overrides applied
#[derive(Debug, Clone, PartialEq)]
pub struct TtlPolicy {
    overrides: HashMap<CacheCategory, Duration>,
    default_ttl: Duration,
}

impl TtlPolicy {
    pub fn new(overrides: HashMap<CacheCategory, Duration>, default_ttl: Duration) -> Self {
        Self {
            overrides,
            default_ttl,
        }
    }

    pub fn for_category(&self, category: CacheCategory) -> Duration {
        self.overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_ttl())
    }

    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        key.category()
            .map_or(self.default_ttl, |c| self.for_category(c))
    }
}
