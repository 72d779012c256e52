use super::verification::{VerificationRequest, VerificationResponse};
use super::workflow::{WorkflowId, WorkflowInstance};
use crate::error::{Result, TellerError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, watch};

/// Remote artefact verification.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationResponse>;
}

/// Free-text advisory service. Answers are suggestions only.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, prompt: &str) -> Result<String>;
}

/// Holds the live workflow sessions of one teller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Arc<WorkflowSession>) -> Result<()>;
    async fn get(&self, id: WorkflowId) -> Result<Option<Arc<WorkflowSession>>>;
    async fn remove(&self, id: WorkflowId) -> Result<Option<Arc<WorkflowSession>>>;
    async fn ids(&self) -> Result<Vec<WorkflowId>>;
}

pub type VerifierBox = Box<dyn Verifier>;
pub type AdvisorBox = Box<dyn Advisor>;
pub type SessionStoreBox = Box<dyn SessionStore>;

/// A workflow instance behind its single-writer lock, plus the signal used
/// to abort in-flight work when the teller cancels.
#[derive(Debug)]
pub struct WorkflowSession {
    id: WorkflowId,
    instance: Mutex<WorkflowInstance>,
    cancel: watch::Sender<bool>,
}

impl WorkflowSession {
    pub fn new(instance: WorkflowInstance) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            id: instance.id(),
            instance: Mutex::new(instance),
            cancel,
        }
    }

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    /// Takes the writer lock, failing fast if another operation holds it.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, WorkflowInstance>> {
        self.instance
            .try_lock()
            .map_err(|_| TellerError::WorkflowBusy(self.id))
    }

    /// Waits for the writer lock.
    pub async fn lock(&self) -> MutexGuard<'_, WorkflowInstance> {
        self.instance.lock().await
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn reset_cancel(&self) {
        self.cancel.send_replace(false);
    }

    pub fn cancelled(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }
}
