//! Where component statuses come from
//!
//! Production code uses `KubeStatusSource`, which lists
//! `/api/v1/componentstatuses` through the cluster API.
//! Tests use `MockStatusSource`, which returns preconfigured responses.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ComponentStatus;
use kube::api::{Api, ListParams};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Component status source unavailable: {0}")]
    Unavailable(String),
}

/// Trait for listing component statuses
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn list(&self) -> Result<Vec<ComponentStatus>, SourceError>;
}

/// Lists component statuses from the API server
pub struct KubeStatusSource {
    api: Api<ComponentStatus>,
}

impl KubeStatusSource {
    pub fn new(client: kube::Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl StatusSource for KubeStatusSource {
    async fn list(&self) -> Result<Vec<ComponentStatus>, SourceError> {
        let list = self.api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

/// Mock source for testing
///
/// Each `list()` call pops the next queued response; once the queue is empty
/// the last response is repeated.
#[cfg(test)]
pub struct MockStatusSource {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<Vec<ComponentStatus>, String>>>,
    last: std::sync::Mutex<Option<Result<Vec<ComponentStatus>, String>>>,
    call_count: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockStatusSource {
    pub fn new(statuses: Vec<ComponentStatus>) -> Self {
        Self::with_responses(vec![Ok(statuses)])
    }

    pub fn new_failing(error_msg: &str) -> Self {
        Self::with_responses(vec![Err(error_msg.to_string())])
    }

    pub fn with_responses(responses: Vec<Result<Vec<ComponentStatus>, String>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            last: std::sync::Mutex::new(None),
            call_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl StatusSource for MockStatusSource {
    async fn list(&self) -> Result<Vec<ComponentStatus>, SourceError> {
        self.call_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| SourceError::Unavailable("lock poisoned".into()))?;
        let mut last = self
            .last
            .lock()
            .map_err(|_| SourceError::Unavailable("lock poisoned".into()))?;

        if let Some(next) = responses.pop_front() {
            *last = Some(next);
        }

        match &*last {
            Some(Ok(statuses)) => Ok(statuses.clone()),
            Some(Err(msg)) => Err(SourceError::Unavailable(msg.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Build a `ComponentStatus` the way the API server reports it
#[cfg(test)]
pub fn component(name: &str, message: Option<&str>, status: &str) -> ComponentStatus {
    use k8s_openapi::api::core::v1::ComponentCondition;
    use kube::api::ObjectMeta;

    ComponentStatus {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        conditions: Some(vec![ComponentCondition {
            type_: "Healthy".to_string(),
            status: status.to_string(),
            message: message.map(str::to_string),
            error: None,
        }]),
    }
}
