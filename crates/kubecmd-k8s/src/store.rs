use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{DeleteParams, DynamicObject, ListParams, PostParams};
use kube::core::TypeMeta;
use kube::{Api, Client};
use serde_json::Value;
use tracing::debug;

use kubecmd_types::{Error, Result};

use crate::error::{Origin, classify, scope};
use crate::registry::{ResourceKind, ResourceKindRegistry};

/// Generic CRUD over any registered resource kind
///
/// Documents are plain JSON values so callers stay independent of the
/// backend's object model. An empty namespace means cluster scope.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn list(&self, kind: &str, namespace: &str) -> Result<Vec<Value>>;

    async fn get(&self, kind: &str, namespace: &str, name: &str) -> Result<Value>;

    async fn create(&self, kind: &str, namespace: &str, payload: Value) -> Result<Value>;

    async fn delete(&self, kind: &str, namespace: &str, name: &str) -> Result<()>;
}

/// [`ResourceStore`] backed by the Kubernetes dynamic API
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
    registry: Arc<ResourceKindRegistry>,
}

impl KubeResourceStore {
    pub fn new(client: Client, registry: Arc<ResourceKindRegistry>) -> Self {
        Self { client, registry }
    }

    /// Build the API handle for a kind
    ///
    /// Cluster-scoped kinds ignore the namespace. Namespaced kinds without a
    /// namespace list across all namespaces and otherwise fall back to the
    /// client's default namespace.
    fn api(&self, kind: &ResourceKind, namespace: &str, listing: bool) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        let client = self.client.clone();

        if !kind.namespaced {
            Api::all_with(client, &ar)
        } else if !namespace.is_empty() {
            Api::namespaced_with(client, namespace, &ar)
        } else if listing {
            Api::all_with(client, &ar)
        } else {
            Api::default_namespaced_with(client, &ar)
        }
    }
}

/// Serialize an object, injecting apiVersion/kind (list items omit them)
fn to_document(obj: DynamicObject, kind: &ResourceKind) -> Result<Value> {
    let mut value = serde_json::to_value(obj).map_err(|e| {
        Error::BackendUnavailable(format!("failed to encode {} object: {}", kind.plural, e))
    })?;
    if let Value::Object(ref mut map) = value {
        map.entry("apiVersion")
            .or_insert_with(|| Value::String(kind.api_version()));
        map.entry("kind")
            .or_insert_with(|| Value::String(kind.kind.clone()));
    }
    Ok(value)
}

/// Build the object to create from a caller document
///
/// Missing apiVersion/kind come from the registry; a namespaced kind takes
/// the command's namespace unless the document names one.
fn to_object(payload: Value, kind: &ResourceKind, namespace: &str) -> Result<DynamicObject> {
    let mut obj: DynamicObject = serde_json::from_value(payload).map_err(|e| {
        Error::InvalidArgument(format!("invalid {} document: {}", kind.plural, e))
    })?;
    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: kind.api_version(),
            kind: kind.kind.clone(),
        });
    }
    if kind.namespaced && !namespace.is_empty() && obj.metadata.namespace.is_none() {
        obj.metadata.namespace = Some(namespace.to_string());
    }
    Ok(obj)
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn list(&self, kind_name: &str, namespace: &str) -> Result<Vec<Value>> {
        let kind = self.registry.resolve(kind_name)?;
        debug!(kind = %kind_name, namespace = %namespace, "Listing resources");

        let list = self
            .api(kind, namespace, true)
            .list(&ListParams::default())
            .await
            .map_err(|e| {
                let context = format!("failed to list {} in {}", kind_name, scope(namespace));
                classify(e, Origin::Resource, &context)
            })?;

        list.items
            .into_iter()
            .map(|item| to_document(item, kind))
            .collect()
    }

    async fn get(&self, kind_name: &str, namespace: &str, name: &str) -> Result<Value> {
        let kind = self.registry.resolve(kind_name)?;
        debug!(kind = %kind_name, namespace = %namespace, name = %name, "Getting resource");

        let obj = self.api(kind, namespace, false).get(name).await.map_err(|e| {
            let context = format!(
                "failed to get {} '{}' in {}",
                kind_name,
                name,
                scope(namespace)
            );
            classify(e, Origin::Resource, &context)
        })?;

        to_document(obj, kind)
    }

    async fn create(&self, kind_name: &str, namespace: &str, payload: Value) -> Result<Value> {
        let kind = self.registry.resolve(kind_name)?;
        let obj = to_object(payload, kind, namespace)?;

        debug!(
            kind = %kind_name,
            namespace = %namespace,
            name = ?obj.metadata.name,
            "Creating resource"
        );

        let created = self
            .api(kind, namespace, false)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| {
                let context = format!("failed to create {} in {}", kind_name, scope(namespace));
                classify(e, Origin::Resource, &context)
            })?;

        to_document(created, kind)
    }

    async fn delete(&self, kind_name: &str, namespace: &str, name: &str) -> Result<()> {
        let kind = self.registry.resolve(kind_name)?;
        debug!(kind = %kind_name, namespace = %namespace, name = %name, "Deleting resource");

        self.api(kind, namespace, false)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| {
                let context = format!(
                    "failed to delete {} '{}' in {}",
                    kind_name,
                    name,
                    scope(namespace)
                );
                classify(e, Origin::Resource, &context)
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use serde_json::json;

    #[test]
    fn test_to_document_injects_type_meta() {
        let kind = ResourceKindRegistry::builtin()
            .resolve("deployments")
            .unwrap()
            .clone();
        let obj = DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                ..Default::default()
            },
            data: json!({"spec": {"replicas": 2}}),
        };

        let doc = to_document(obj, &kind).unwrap();
        assert_eq!(doc["apiVersion"], "apps/v1");
        assert_eq!(doc["kind"], "Deployment");
        assert_eq!(doc["metadata"]["name"], "web");
        assert_eq!(doc["spec"]["replicas"], 2);
    }

    fn kind(name: &str) -> ResourceKind {
        ResourceKindRegistry::builtin().resolve(name).unwrap().clone()
    }

    #[test]
    fn test_to_object_fills_type_meta_and_namespace() {
        let payload = json!({"metadata": {"name": "web"}});
        let obj = to_object(payload, &kind("services"), "prod").unwrap();
        let types = obj.types.unwrap();
        assert_eq!(types.api_version, "v1");
        assert_eq!(types.kind, "Service");
        assert_eq!(obj.metadata.namespace.as_deref(), Some("prod"));
    }

    #[test]
    fn test_to_object_keeps_explicit_values() {
        let payload = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "staging"},
        });
        let obj = to_object(payload, &kind("deployments"), "prod").unwrap();
        assert_eq!(obj.metadata.namespace.as_deref(), Some("staging"));

        let payload = json!({"metadata": {"name": "ops"}});
        let obj = to_object(payload, &kind("namespaces"), "prod").unwrap();
        assert_eq!(obj.metadata.namespace, None);
    }

    #[test]
    fn test_to_object_rejects_malformed_document() {
        let err = to_object(json!({"metadata": "x"}), &kind("configmaps"), "prod").unwrap_err();
        let Error::InvalidArgument(msg) = err else {
            panic!("unexpected error: {}", err);
        };
        assert!(msg.starts_with("invalid configmaps document"), "{}", msg);
    }
}
