//! Kubernetes Secrets object store
//!
//! Persists every generation as an immutable `Opaque` Secret. Creation
//! timestamps come from the API server, and label selectors are evaluated
//! server-side.

use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta as KubeObjectMeta;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client};

use crate::core::{Generation, ObjectMeta, Payload, StoreError};
use crate::traits::{LabelSelector, ObjectStore};

/// Secret type used for every generation
pub const SECRET_TYPE: &str = "Opaque";

/// [`ObjectStore`] backed by Kubernetes Secrets
#[derive(Clone)]
pub struct KubernetesObjectStore {
    client: Client,
}

impl std::fmt::Debug for KubernetesObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesObjectStore").finish_non_exhaustive()
    }
}

impl KubernetesObjectStore {
    /// Store using an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Store using the in-cluster config, or the local kubeconfig
    pub async fn try_default() -> Result<Self, StoreError> {
        let client = Client::try_default()
            .await
            .map_err(|e| StoreError::backend("connect", e.to_string()))?;

        tracing::info!("Initialized Kubernetes object store");
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a kube error, keeping conflicts and absence distinguishable
fn map_error(operation: &str, name: &str, error: kube::Error) -> StoreError {
    match &error {
        kube::Error::Api(response) if response.code == 409 => StoreError::AlreadyExists {
            name: name.to_string(),
        },
        kube::Error::Api(response) if response.code == 404 => StoreError::NotFound {
            name: name.to_string(),
        },
        _ => StoreError::backend(operation, error.to_string()),
    }
}

fn to_secret(meta: &ObjectMeta, data: &Payload) -> Secret {
    Secret {
        metadata: KubeObjectMeta {
            name: Some(meta.name.clone()),
            namespace: Some(meta.namespace.clone()),
            labels: Some(meta.labels.clone()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(key, value)| (key.clone(), ByteString(value.clone())))
                .collect(),
        ),
        immutable: Some(true),
        type_: Some(SECRET_TYPE.to_string()),
        ..Default::default()
    }
}

fn to_generation(secret: Secret) -> Result<Generation, StoreError> {
    let name = secret.metadata.name.unwrap_or_default();
    let created_at = secret
        .metadata
        .creation_timestamp
        .map(|time| time.0)
        .ok_or_else(|| {
            StoreError::backend("decode", format!("secret '{name}' has no creation timestamp"))
        })?;

    Ok(Generation {
        namespace: secret.metadata.namespace.unwrap_or_default(),
        created_at,
        labels: secret.metadata.labels.unwrap_or_default(),
        data: secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect(),
        object_name: name,
    })
}

#[async_trait]
impl ObjectStore for KubernetesObjectStore {
    async fn create(&self, meta: &ObjectMeta, data: &Payload) -> Result<Generation, StoreError> {
        let secret = self
            .api(&meta.namespace)
            .create(&PostParams::default(), &to_secret(meta, data))
            .await
            .map_err(|e| map_error("create", &meta.name, e))?;

        tracing::debug!(
            object_name = %meta.name,
            namespace = %meta.namespace,
            "Created Kubernetes Secret"
        );
        to_generation(secret)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Generation, StoreError> {
        let secret = self
            .api(namespace)
            .get(name)
            .await
            .map_err(|e| map_error("get", name, e))?;
        to_generation(secret)
    }

    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Generation>, StoreError> {
        let params = ListParams::default().labels(&selector.to_string());
        let secrets = self
            .api(namespace)
            .list(&params)
            .await
            .map_err(|e| map_error("list", namespace, e))?;

        secrets.items.into_iter().map(to_generation).collect()
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_error("delete", name, e))?;

        tracing::debug!(
            object_name = %name,
            namespace = %namespace,
            "Deleted Kubernetes Secret"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "boom".into(),
            reason: "Test".into(),
            code,
        })
    }

    #[test]
    fn test_error_mapping() {
        assert!(map_error("create", "ca", api_error(409)).is_already_exists());
        assert!(map_error("get", "ca", api_error(404)).is_not_found());
        assert!(matches!(
            map_error("list", "ns", api_error(500)),
            StoreError::Backend { .. }
        ));
    }

    #[test]
    fn test_secret_round_trip() {
        let mut meta_labels = crate::core::Labels::new();
        meta_labels.insert("name".into(), "ca".into());
        let meta = ObjectMeta {
            name: "ca".into(),
            namespace: "kube-system".into(),
            labels: meta_labels,
        };
        let mut data = Payload::new();
        data.insert("ca.crt".into(), b"cert".to_vec());

        let mut secret = to_secret(&meta, &data);
        assert_eq!(secret.immutable, Some(true));
        assert_eq!(secret.type_.as_deref(), Some(SECRET_TYPE));

        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        secret.metadata.creation_timestamp = Some(Time(created));
        let generation = to_generation(secret).unwrap();

        assert_eq!(generation.object_name, "ca");
        assert_eq!(generation.created_at, created);
        assert_eq!(generation.labels, meta.labels);
        assert_eq!(generation.data, data);
    }

    #[test]
    fn test_missing_creation_timestamp() {
        let secret = to_secret(
            &ObjectMeta {
                name: "ca".into(),
                namespace: "default".into(),
                labels: Default::default(),
            },
            &Payload::new(),
        );
        assert!(to_generation(secret).is_err());
    }
}
