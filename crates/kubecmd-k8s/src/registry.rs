//! Resource kind registry
//!
//! Maps the resource type string of a command (`pods`, `deployments`, ...) to
//! the coordinates needed to address it through the dynamic API. The table is
//! built once at start-up and never mutated afterwards, so lookups need no
//! locking.

use std::collections::HashMap;
use std::sync::LazyLock;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::Resource;
use kube::discovery::ApiResource;

use kubecmd_types::{Error, Result};

static BUILTIN: LazyLock<ResourceKindRegistry> = LazyLock::new(build_builtin);

/// Backend coordinates of one resource kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceKind {
    pub group: String,
    pub version: String,
    pub plural: String,
    /// Object `kind` (e.g. `Deployment`)
    pub kind: String,
    pub namespaced: bool,
}

impl ResourceKind {
    /// The `(group, version, resource)` triple
    pub fn coordinates(&self) -> (&str, &str, &str) {
        (&self.group, &self.version, &self.plural)
    }

    /// `v1`, `apps/v1`, `networking.k8s.io/v1`
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: self.api_version(),
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }
}

/// Immutable lookup table of supported resource kinds
#[derive(Clone, Debug)]
pub struct ResourceKindRegistry {
    kinds: HashMap<String, ResourceKind>,
}

impl ResourceKindRegistry {
    /// The built-in table shared by the whole process
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Built-in table extended with extra kinds, keyed by their plural name
    ///
    /// Built-in entries win when an extra kind reuses their name.
    pub fn with_extra(extra: impl IntoIterator<Item = ResourceKind>) -> Self {
        let mut kinds = BUILTIN.kinds.clone();
        for kind in extra {
            kinds.entry(kind.plural.clone()).or_insert(kind);
        }
        Self { kinds }
    }

    /// Exact, case-sensitive lookup
    pub fn resolve(&self, kind: &str) -> Result<&ResourceKind> {
        self.kinds
            .get(kind)
            .ok_or_else(|| Error::UnsupportedKind(kind.to_string()))
    }

    /// Sorted list of supported kind names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn build_builtin() -> ResourceKindRegistry {
    let mut kinds = HashMap::new();

    // Coordinates come from the k8s-openapi type metadata
    macro_rules! add_kind {
        ($type:ty, $namespaced:expr) => {{
            let kind = ResourceKind {
                group: <$type>::group(&()).to_string(),
                version: <$type>::version(&()).to_string(),
                plural: <$type>::plural(&()).to_string(),
                kind: <$type>::kind(&()).to_string(),
                namespaced: $namespaced,
            };
            kinds.insert(kind.plural.clone(), kind);
        }};
    }

    add_kind!(Pod, true);
    add_kind!(Service, true);
    add_kind!(Deployment, true);
    add_kind!(Namespace, false);
    add_kind!(ConfigMap, true);
    add_kind!(Secret, true);
    add_kind!(PersistentVolume, false);
    add_kind!(PersistentVolumeClaim, true);
    add_kind!(StatefulSet, true);
    add_kind!(DaemonSet, true);
    add_kind!(Ingress, true);

    ResourceKindRegistry { kinds }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_pods() {
        let kind = ResourceKindRegistry::builtin().resolve("pods").unwrap();
        assert_eq!(kind.coordinates(), ("", "v1", "pods"));
        assert_eq!(kind.kind, "Pod");
        assert!(kind.namespaced);
    }

    #[test]
    fn test_resolve_grouped_kinds() {
        let registry = ResourceKindRegistry::builtin();
        assert_eq!(
            registry.resolve("deployments").unwrap().coordinates(),
            ("apps", "v1", "deployments")
        );
        let ingress = registry.resolve("ingresses").unwrap();
        assert_eq!(ingress.api_version(), "networking.k8s.io/v1");
        assert!(!registry.resolve("namespaces").unwrap().namespaced);
    }

    #[test]
    fn test_resolve_unknown_kind() {
        let err = ResourceKindRegistry::builtin()
            .resolve("not-a-kind")
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedKind("not-a-kind".to_string()));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert!(ResourceKindRegistry::builtin().resolve("Pods").is_err());
    }

    #[test]
    fn test_builtin_table() {
        assert_eq!(ResourceKindRegistry::builtin().len(), 11);
    }

    #[test]
    fn test_with_extra() {
        let cronjobs = ResourceKind {
            group: "batch".to_string(),
            version: "v1".to_string(),
            plural: "cronjobs".to_string(),
            kind: "CronJob".to_string(),
            namespaced: true,
        };
        let shadow = ResourceKind {
            group: "example.com".to_string(),
            plural: "pods".to_string(),
            ..cronjobs.clone()
        };
        let registry = ResourceKindRegistry::with_extra([cronjobs, shadow]);

        assert_eq!(
            registry.resolve("cronjobs").unwrap().api_resource().api_version,
            "batch/v1"
        );
        assert_eq!(registry.resolve("pods").unwrap().group, "");
        assert_eq!(registry.len(), 12);
    }
}
