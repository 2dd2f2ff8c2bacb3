//! Generic resource reconciliation
//!
//! One [`Reconciler`] implementation drives Create/Read/Update/Delete/Import
//! for every resource kind, parameterized over a per-kind [`WireCodec`] that
//! supplies the asymmetric write/read encodings, the identity accessor, and
//! the mutable/immutable field split. This replaces per-resource copy-pasted
//! CRUD with a single state machine.

pub mod apply;

use crate::error::{Error, Result};
use crate::session::Session;
use reqwest::Method;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Codec Contract
// =============================================================================

/// How a resource kind is read back from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStyle {
    /// Per-identity GET on the item path
    Keyed,
    /// GET on the collection path returns a full listing; filter client-side
    Listing,
}

/// Field-level difference between desired and observed canonical state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    /// Differing fields the remote API accepts in an update payload
    pub mutable: Vec<&'static str>,
    /// Differing fields that can only change through replacement
    pub immutable: Vec<&'static str>,
}

impl Drift {
    pub fn is_clean(&self) -> bool {
        self.mutable.is_empty() && self.immutable.is_empty()
    }

    pub fn needs_replace(&self) -> bool {
        !self.immutable.is_empty()
    }
}

/// Outcome of an update pass; immutable drift is a first-class result,
/// never an in-place PUT
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Observed state already matches desired state
    Unchanged,
    /// Mutable fields were pushed via PUT
    Updated,
    /// Immutable fields differ; the caller must delete and recreate
    ReplaceRequired { fields: Vec<&'static str> },
}

/// Per-resource-kind translation between canonical records and the two
/// divergent wire shapes the dashboard uses for writes versus reads.
///
/// The write/read asymmetry (e.g. `pool` on create vs `pool_name` on read)
/// is enumerated field by field inside each implementation; nothing here
/// assumes payloads round-trip automatically.
pub trait WireCodec {
    type Resource: Clone + Send + Sync;

    /// Resource kind label used in paths-of-record, logs and errors
    const KIND: &'static str;

    /// Immutable identity of a canonical record
    fn identity(resource: &Self::Resource) -> &str;

    /// Collection endpoint, e.g. `/api/pool`
    fn collection_path() -> &'static str;

    /// Item endpoint for one identity, path-escaped
    fn item_path(id: &str) -> String {
        format!("{}/{}", Self::collection_path(), urlencoding::encode(id))
    }

    fn read_style() -> ReadStyle;

    /// Full write payload for POST
    fn encode_create(resource: &Self::Resource) -> Value;

    /// Partial write payload for PUT, carrying only the fields the remote
    /// API accepts as mutable. `None` means the kind has no update endpoint.
    fn encode_update(resource: &Self::Resource) -> Option<Value>;

    /// Decode the read shape into canonical form; absent optional fields
    /// decode to their zero values, never an error
    fn decode(value: &Value) -> Result<Self::Resource>;

    /// Field-by-field comparison of desired against freshly observed state
    fn diff(desired: &Self::Resource, observed: &Self::Resource) -> Drift;

    /// Copy server-assigned fields (e.g. a rule's numeric id) from the
    /// post-create read-back into the canonical record
    fn merge_server_fields(_desired: &mut Self::Resource, _observed: &Self::Resource) {}
}

// =============================================================================
// Reconciler
// =============================================================================

/// Drives one resource kind's lifecycle against the dashboard API
pub struct Reconciler<C: WireCodec> {
    session: Arc<Session>,
    _codec: PhantomData<C>,
}

impl<C: WireCodec> Reconciler<C> {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            _codec: PhantomData,
        }
    }

    /// Create the resource, then perform the mandatory read-back to recover
    /// server-assigned fields. Returns the merged canonical record.
    pub async fn create(&self, desired: &C::Resource) -> Result<C::Resource> {
        let name = C::identity(desired).to_string();
        let payload = C::encode_create(desired);
        self.session
            .execute(Method::POST, C::collection_path(), Some(payload))
            .await?;

        let observed = self.read(&name).await?;
        let mut merged = desired.clone();
        C::merge_server_fields(&mut merged, &observed);
        info!(kind = C::KIND, name = %name, "created");
        Ok(merged)
    }

    /// Read the observed canonical state for one identity.
    ///
    /// A missing object yields [`Error::NotFound`], the only failure a
    /// caller may use to drive re-creation.
    pub async fn read(&self, id: &str) -> Result<C::Resource> {
        match C::read_style() {
            ReadStyle::Keyed => {
                let body = self
                    .session
                    .execute(Method::GET, &C::item_path(id), None)
                    .await
                    .map_err(|e| match e {
                        Error::Protocol { status: 404, body } => {
                            Error::from_status(C::KIND, id, 404, body)
                        }
                        other => other,
                    })?;
                let value: Value = serde_json::from_slice(&body)?;
                C::decode(&value)
            }
            ReadStyle::Listing => {
                let body = self
                    .session
                    .execute(Method::GET, C::collection_path(), None)
                    .await?;
                let value: Value = serde_json::from_slice(&body)?;
                let items = value.as_array().ok_or_else(|| Error::UnexpectedShape {
                    kind: C::KIND.to_string(),
                    detail: "expected a listing array".to_string(),
                })?;
                for item in items {
                    let resource = C::decode(item)?;
                    if C::identity(&resource) == id {
                        return Ok(resource);
                    }
                }
                Err(Error::NotFound {
                    kind: C::KIND.to_string(),
                    name: id.to_string(),
                })
            }
        }
    }

    /// Adopt an existing remote object by identity (no write traffic)
    pub async fn import(&self, id: &str) -> Result<C::Resource> {
        debug!(kind = C::KIND, name = id, "importing existing resource");
        self.read(id).await
    }

    /// Compare desired against freshly observed state and push mutable
    /// drift via PUT. Immutable drift never results in a PUT; it is
    /// reported as [`UpdateOutcome::ReplaceRequired`] for the caller to
    /// turn into delete-then-create.
    pub async fn update(&self, desired: &C::Resource) -> Result<UpdateOutcome> {
        let id = C::identity(desired);
        let observed = self.read(id).await?;
        let drift = C::diff(desired, &observed);

        if drift.needs_replace() {
            return Ok(UpdateOutcome::ReplaceRequired {
                fields: drift.immutable,
            });
        }
        if drift.is_clean() {
            debug!(kind = C::KIND, name = id, "no drift");
            return Ok(UpdateOutcome::Unchanged);
        }

        match C::encode_update(desired) {
            Some(payload) => {
                self.session
                    .execute(Method::PUT, &C::item_path(id), Some(payload))
                    .await?;
                info!(kind = C::KIND, name = id, fields = ?drift.mutable, "updated");
                Ok(UpdateOutcome::Updated)
            }
            // No update endpoint for this kind: any drift forces replacement
            None => Ok(UpdateOutcome::ReplaceRequired {
                fields: drift.mutable,
            }),
        }
    }

    /// Delete by identity. A 404 surfaces verbatim as a protocol failure;
    /// whether "already gone" counts as success is the caller's policy.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.session
            .execute(Method::DELETE, &C::item_path(id), None)
            .await?;
        info!(kind = C::KIND, name = id, "deleted");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
