use serde::{Deserialize, Serialize};

pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Invocation-order class; every Priority runs before any Ordered, every Ordered before any Unordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Priority,
    Ordered,
    Unordered,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Priority => "priority",
            Tier::Ordered => "ordered",
            Tier::Unordered => "unordered",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An item classified once, at discovery time, with its tier and order value
#[derive(Debug, Clone)]
pub struct Ranked<T> {
    pub name: String,
    pub tier: Tier,
    pub order: i32,
    pub item: T,
}

impl<T> Ranked<T> {
    pub fn new(name: impl Into<String>, tier: Tier, order: Option<i32>, item: T) -> Self {
        Self {
            name: name.into(),
            tier,
            order: order.unwrap_or(LOWEST_PRECEDENCE),
            item,
        }
    }
}

/// Stable sort: tier first, then ascending order value, then discovery order
pub fn sort_ranked<T>(items: &mut [Ranked<T>]) {
    items.sort_by_key(|ranked| (ranked.tier, ranked.order));
}
