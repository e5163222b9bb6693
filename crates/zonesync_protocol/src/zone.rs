//! Zones, subscriptions and push signals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a remote zone, the partition change queries are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Creates a zone ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the zone name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a change subscription.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Creates a subscription ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the subscription name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote registration that turns every change in a zone into a push signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription identity.
    pub id: SubscriptionId,
    /// Zone whose changes are reported.
    pub zone_id: ZoneId,
    /// Whether the signal should wake the receiver even without visible content.
    pub wants_content_wake: bool,
}

impl Subscription {
    /// Creates a subscription for a zone.
    pub fn new(id: SubscriptionId, zone_id: ZoneId, wants_content_wake: bool) -> Self {
        Self {
            id,
            zone_id,
            wants_content_wake,
        }
    }
}

/// A "zone changed" push signal.
///
/// Receivers must not rely on its content: signals can be duplicated,
/// delayed or reordered, and a single signal may stand for many changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneChanged {
    /// Zone that changed.
    pub zone_id: ZoneId,
    /// Subscription that produced the signal.
    pub subscription_id: SubscriptionId,
}
