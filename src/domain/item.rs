//! Item Entity
//!
//! The unit managed by an ordered store: a typed payload at a dense
//! position inside one owner.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::ids::{ItemId, OwnerId};

/// Closed tag enum naming the variants of a payload family
pub trait ItemKind: Copy + Eq + Debug + Send + Sync + 'static {
    fn as_str(&self) -> &'static str;

    fn parse(s: &str) -> Option<Self>;
}

/// Variant-specific content of an item
pub trait Payload:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Kind: ItemKind;

    fn kind(&self) -> Self::Kind;

    /// Default content for a freshly added item of `kind`
    fn empty(kind: Self::Kind) -> Self;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// An ordered item belonging to one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "P: Payload")]
pub struct Item<P> {
    pub id: ItemId,
    pub owner_id: OwnerId,
    /// Zero-based, dense within the owner
    pub position: u32,
    pub payload: P,
    /// Set by the remote store, absent for local-only items
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl<P: Payload> Item<P> {
    /// Create a local-only item with an empty payload
    pub fn new_local(owner_id: OwnerId, kind: P::Kind, position: u32) -> Self {
        Self::with_payload(ItemId::new_local(), owner_id, P::empty(kind), position)
    }

    pub fn with_payload(id: ItemId, owner_id: OwnerId, payload: P, position: u32) -> Self {
        Self {
            id,
            owner_id,
            position,
            payload,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn kind(&self) -> P::Kind {
        self.payload.kind()
    }

    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }

    /// Structural comparison of the persisted fields (kind, payload, position)
    pub fn same_content(&self, other: &Self) -> bool {
        self.position == other.position && self.payload == other.payload
    }
}

/// Partial update sent to the remote store; `None` fields are left untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "P: Payload")]
pub struct ItemPatch<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl<P: Payload> ItemPatch<P> {
    pub fn position(position: u32) -> Self {
        Self {
            payload: None,
            position: Some(position),
        }
    }

    /// Patch carrying every persisted field of `item`
    pub fn full(item: &Item<P>) -> Self {
        Self {
            payload: Some(item.payload.clone()),
            position: Some(item.position),
        }
    }

    /// Patch carrying only the fields where `current` differs from `baseline`
    pub fn between(current: &Item<P>, baseline: &Item<P>) -> Self {
        Self {
            payload: (current.payload != baseline.payload).then(|| current.payload.clone()),
            position: (current.position != baseline.position).then_some(current.position),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none() && self.position.is_none()
    }

    /// Apply to an item in place
    pub fn apply(&self, item: &mut Item<P>) {
        if let Some(payload) = &self.payload {
            item.payload = payload.clone();
        }
        if let Some(position) = self.position {
            item.position = position;
        }
    }
}
