//! Fetch and persist boundary of the policy editor.
//!
//! A [RoutingTreeStore] is the system of record for one raw tree. [load] pulls the tree and
//! assigns identities; [commit] re-fetches, refuses to overwrite a tree that changed since it
//! was loaded, then persists the edited tree without identities.
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    codec::TreeCodec,
    properties::{Route, RouteWithId, TreeMetadata},
    routetree::{assert_unchanged, assign_identities, strip_identities},
    PolicyError,
};

/// A tree as handed to the editor: identities assigned, metadata from the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedTree {
    pub tree: RouteWithId,
    pub metadata: TreeMetadata,
}

pub trait RoutingTreeStore: Send + Sync {
    fn fetch(&self) -> Result<(Route, TreeMetadata), PolicyError>;

    /// Replace the stored tree. When `expected_version` is given and no longer matches the
    /// stored version the write is refused with [PolicyError::ConcurrentModification].
    fn persist(
        &self,
        route: Route,
        expected_version: Option<&str>,
    ) -> Result<TreeMetadata, PolicyError>;
}

/// Content version of a raw tree: hex encoded SHA-256 of its JSON form.
pub fn resource_version(route: &Route) -> Result<String, PolicyError> {
    let bytes = serde_json::to_vec(route)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn check_version(current: &str, expected_version: Option<&str>) -> Result<(), PolicyError> {
    match expected_version {
        Some(expected) if expected != current => {
            tracing::debug!(
                "[store::persist] stored version {} does not match expected {}",
                current,
                expected
            );
            Err(PolicyError::ConcurrentModification)
        }
        _ => Ok(()),
    }
}

struct Stored {
    route: Route,
    metadata: TreeMetadata,
}

/// Store keeping the raw tree in memory.
pub struct InMemoryTreeStore {
    state: RwLock<Stored>,
}

impl InMemoryTreeStore {
    pub fn new(route: Route) -> Result<Self, PolicyError> {
        let metadata = TreeMetadata {
            provenance: route.provenance.clone(),
            resource_version: Some(resource_version(&route)?),
        };
        Ok(InMemoryTreeStore {
            state: RwLock::new(Stored { route, metadata }),
        })
    }
}

impl RoutingTreeStore for InMemoryTreeStore {
    fn fetch(&self) -> Result<(Route, TreeMetadata), PolicyError> {
        let state = self.state.read();
        Ok((state.route.clone(), state.metadata.clone()))
    }

    fn persist(
        &self,
        route: Route,
        expected_version: Option<&str>,
    ) -> Result<TreeMetadata, PolicyError> {
        let mut state = self.state.write();
        let current = state.metadata.resource_version.clone().unwrap_or_default();
        check_version(&current, expected_version)?;
        let metadata = TreeMetadata {
            provenance: state.metadata.provenance.clone(),
            resource_version: Some(resource_version(&route)?),
        };
        *state = Stored {
            route,
            metadata: metadata.clone(),
        };
        Ok(metadata)
    }
}

/// Store keeping a serialized transport document in memory, read and written through a
/// [TreeCodec].
pub struct DocumentTreeStore<C: TreeCodec> {
    codec: C,
    document: RwLock<String>,
}

impl<C: TreeCodec> DocumentTreeStore<C> {
    pub fn new(codec: C, document: String) -> Self {
        DocumentTreeStore {
            codec,
            document: RwLock::new(document),
        }
    }

    pub fn document(&self) -> String {
        self.document.read().clone()
    }

    fn decode(&self, document: &str) -> Result<(Route, TreeMetadata), PolicyError> {
        let (route, mut metadata) = self.codec.decode(document)?;
        if metadata.resource_version.is_none() {
            metadata.resource_version = Some(resource_version(&route)?);
        }
        Ok((route, metadata))
    }
}

impl<C: TreeCodec> RoutingTreeStore for DocumentTreeStore<C> {
    fn fetch(&self) -> Result<(Route, TreeMetadata), PolicyError> {
        self.decode(&self.document.read())
    }

    fn persist(
        &self,
        route: Route,
        expected_version: Option<&str>,
    ) -> Result<TreeMetadata, PolicyError> {
        let mut document = self.document.write();
        let (_, stored) = self.decode(&document)?;
        check_version(
            stored.resource_version.as_deref().unwrap_or_default(),
            expected_version,
        )?;
        let metadata = TreeMetadata {
            provenance: stored.provenance,
            resource_version: Some(resource_version(&route)?),
        };
        *document = self.codec.encode(&document, &route, &metadata)?;
        tracing::debug!(
            "[DocumentTreeStore::persist] wrote tree version {:?}",
            metadata.resource_version
        );
        Ok(metadata)
    }
}

/// Fetch the current tree and give every node an identity.
#[tracing::instrument(skip_all)]
pub fn load(store: &dyn RoutingTreeStore) -> Result<FetchedTree, PolicyError> {
    let (route, metadata) = store.fetch()?;
    let tree = assign_identities(&route)?;
    Ok(FetchedTree { tree, metadata })
}

/// Persist `edited`, provided the stored tree still equals `snapshot`, the tree the edit was
/// based on. On [PolicyError::ConcurrentModification] nothing is written.
#[tracing::instrument(skip_all)]
pub fn commit(
    store: &dyn RoutingTreeStore,
    snapshot: &RouteWithId,
    edited: &RouteWithId,
) -> Result<FetchedTree, PolicyError> {
    let (latest, latest_metadata) = store.fetch()?;
    let latest = assign_identities(&latest)?;
    assert_unchanged(&latest, snapshot)?;
    let metadata = store.persist(
        strip_identities(edited),
        latest_metadata.resource_version.as_deref(),
    )?;
    tracing::info!(
        "[store::commit] committed policy tree with {} policies",
        edited.node_count()
    );
    Ok(FetchedTree {
        tree: edited.clone(),
        metadata,
    })
}
