//! Access control declarations for mounted resources.
use std::{
    collections::{BTreeMap, HashMap},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Visibility of a single controller action.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionAcl {
    pub protected: bool,
}

/// Maps action names (`create`, `read`, ...) to their visibility.
pub type RouteAcl = BTreeMap<String, ActionAcl>;

/// A resource that can be mounted on the router.
pub trait Registrable {
    /// The resource name used when registering access control.
    const RESOURCE: &'static str;
    /// The path the resource is mounted on.
    const ROUTE: &'static str;

    fn route_acl() -> RouteAcl;
}

/// A resource's access control declaration as recorded at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub resource: String,
    pub route: String,
    pub acl: RouteAcl,
}

/// Collects the access control declarations of every mounted resource.
/// Written while the router is built and only read afterwards.
#[derive(Debug, Default)]
pub struct AclRegistry {
    entries: RwLock<HashMap<String, AclEntry>>,
}

impl AclRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the declaration of `R`. Registering the same resource twice
    /// replaces the earlier entry.
    pub fn register<R: Registrable>(&self) {
        let entry = AclEntry {
            resource: R::RESOURCE.to_owned(),
            route: R::ROUTE.to_owned(),
            acl: R::route_acl(),
        };

        for (action, acl) in &entry.acl {
            debug!(
                "registering {:?} {} on {} (protected: {})",
                entry.resource, action, entry.route, acl.protected
            );
        }

        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(entry.resource.clone(), entry);
            }
            Err(err) => error!("error acquiring the lock for the acl registry: {:?}", err),
        }
    }

    /// Returns the declaration recorded for `resource`, if any.
    pub fn get(&self, resource: &str) -> Option<AclEntry> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(resource).cloned())
    }

    /// Whether `action` on `resource` requires an authenticated caller.
    /// Undeclared actions are treated as protected.
    pub fn is_protected(&self, resource: &str, action: &str) -> bool {
        self.get(resource)
            .and_then(|entry| entry.acl.get(action).copied())
            .map_or(true, |acl| acl.protected)
    }
}
