use crate::domain::ports::{SessionStore, WorkflowSession};
use crate::domain::workflow::WorkflowId;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for the sessions of one teller.
///
/// Uses `Arc<RwLock<HashMap<WorkflowId, Arc<WorkflowSession>>>>`; the map lock
/// is only held to look a session up, never while a workflow operation runs.
/// Sessions do not outlive the process.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<WorkflowId, Arc<WorkflowSession>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Arc<WorkflowSession>) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id(), session);
        Ok(())
    }

    async fn get(&self, id: WorkflowId) -> Result<Option<Arc<WorkflowSession>>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn remove(&self, id: WorkflowId) -> Result<Option<Arc<WorkflowSession>>> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(&id))
    }

    async fn ids(&self) -> Result<Vec<WorkflowId>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::fixtures::retail_profile;
    use crate::domain::service::ServiceId;
    use crate::domain::workflow::WorkflowInstance;

    fn session() -> Arc<WorkflowSession> {
        Arc::new(WorkflowSession::new(WorkflowInstance::open(
            ServiceId::KycUpdate,
            retail_profile(),
        )))
    }

    #[tokio::test]
    async fn test_in_memory_session_store() {
        let store = InMemorySessionStore::new();
        let session = session();
        let id = session.id();

        store.insert(Arc::clone(&session)).await.unwrap();
        let retrieved = store.get(id).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&retrieved, &session));
        assert_eq!(store.ids().await.unwrap(), vec![id]);

        assert!(store.remove(id).await.unwrap().is_some());
        assert!(store.get(id).await.unwrap().is_none());
        assert!(store.remove(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_sessions() {
        let store = InMemorySessionStore::new();
        let other = store.clone();
        let session = session();
        store.insert(Arc::clone(&session)).await.unwrap();
        assert!(other.get(session.id()).await.unwrap().is_some());
    }
}
