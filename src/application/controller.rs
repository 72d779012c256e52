use crate::config::PolicyConfig;
use crate::domain::customer::CustomerProfile;
use crate::domain::ports::{AdvisorBox, SessionStoreBox, VerifierBox, WorkflowSession};
use crate::domain::service::{ServiceId, SummaryLine};
use crate::domain::verification::{VerificationRequest, VerificationResponse, fallback_verify};
use crate::domain::workflow::{Feedback, Stage, SupervisorSignOff, WorkflowId, WorkflowInstance};
use crate::error::{Result, TellerError};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of an advisory request. The workflow never waits on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    Suggestion(String),
    Unavailable,
}

/// Drives workflow instances on behalf of a teller.
///
/// Every instance lives in its own `WorkflowSession`. Operations take the
/// session's lock with `try_lock`, so a second operation on a busy instance
/// fails with `WorkflowBusy` instead of queueing behind the first one.
pub struct WorkflowController {
    store: SessionStoreBox,
    verifier: VerifierBox,
    advisor: AdvisorBox,
    policy: PolicyConfig,
}

impl WorkflowController {
    pub fn new(
        store: SessionStoreBox,
        verifier: VerifierBox,
        advisor: AdvisorBox,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            store,
            verifier,
            advisor,
            policy,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    async fn session(&self, id: WorkflowId) -> Result<Arc<WorkflowSession>> {
        self.store
            .get(id)
            .await?
            .ok_or(TellerError::WorkflowNotFound(id))
    }

    /// Applies a pure transition under the instance's writer lock.
    async fn transition<F>(&self, id: WorkflowId, action: &'static str, f: F) -> Result<WorkflowInstance>
    where
        F: FnOnce(&WorkflowInstance) -> Result<WorkflowInstance>,
    {
        let session = self.session(id).await?;
        let mut instance = session.try_lock()?;
        let from = instance.stage();
        match f(&instance) {
            Ok(next) => {
                if next.stage() != from {
                    info!(workflow = %id, action, from = %from, to = %next.stage(), "stage changed");
                }
                *instance = next;
                Ok(instance.clone())
            }
            Err(e) => {
                warn!(workflow = %id, action, stage = %from, error = %e, "operation rejected");
                Err(e)
            }
        }
    }

    pub async fn open(&self, service: ServiceId, customer: CustomerProfile) -> Result<WorkflowId> {
        let instance = WorkflowInstance::open(service, customer);
        let id = instance.id();
        info!(workflow = %id, service = %service, segment = %instance.customer().segment(), "workflow opened");
        self.store.insert(Arc::new(WorkflowSession::new(instance))).await?;
        Ok(id)
    }

    /// A copy of the instance's current state.
    pub async fn snapshot(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        let session = self.session(id).await?;
        let instance = session.try_lock()?;
        Ok(instance.clone())
    }

    pub async fn summary(&self, id: WorkflowId) -> Result<Vec<SummaryLine>> {
        Ok(self.snapshot(id).await?.summary())
    }

    pub async fn active(&self) -> Result<Vec<WorkflowId>> {
        self.store.ids().await
    }

    pub async fn submit_input(&self, id: WorkflowId, payload: &Map<String, Value>) -> Result<WorkflowInstance> {
        let next = self
            .transition(id, "submit input", |i| i.submit_input(payload, &self.policy))
            .await?;
        if next.stage() == Stage::Input {
            warn!(
                workflow = %id,
                errors = next.validation_errors().len(),
                "input rejected, awaiting corrections"
            );
        } else if let Some(pricing) = next.pricing() {
            debug!(
                workflow = %id,
                total_charges = %pricing.charges.total_charges,
                offered_rate = ?pricing.quote.as_ref().map(|q| q.offered_rate),
                channel = ?pricing.selected_channel,
                "transaction priced"
            );
        }
        if next.approval_required() {
            info!(workflow = %id, reasons = next.approval_reasons().len(), "supervisor approval required");
        }
        Ok(next)
    }

    pub async fn request_changes(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        self.transition(id, "request changes", |i| i.request_changes())
            .await
    }

    pub async fn proceed_to_processing(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        self.transition(id, "proceed to processing", |i| i.proceed_to_processing())
            .await
    }

    pub async fn adjust_rate(&self, id: WorkflowId, officer_rate: Option<Decimal>) -> Result<WorkflowInstance> {
        self.transition(id, "adjust rate", |i| i.adjust_rate(officer_rate, &self.policy))
            .await
    }

    pub async fn acknowledge_summary(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        self.transition(id, "acknowledge summary", |i| i.acknowledge_summary())
            .await
    }

    pub async fn with_notes(&self, id: WorkflowId, notes: String) -> Result<WorkflowInstance> {
        self.transition(id, "edit notes", |i| i.with_notes(notes))
            .await
    }

    /// Verifies the transaction's artefacts and advances to authorization.
    ///
    /// The instance stays locked while the verifier runs. A cancel issued in
    /// the meantime aborts the call and leaves the instance unchanged.
    pub async fn confirm_verification(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        let session = self.session(id).await?;
        let mut instance = session.try_lock()?;
        let request = instance.verification_request()?;

        let mut cancelled = session.cancelled();
        let response = tokio::select! {
            _ = cancelled.wait_for(|c| *c) => {
                warn!(workflow = %id, "verification aborted by cancellation");
                return Err(TellerError::Cancelled);
            }
            response = self.verify(&request) => response,
        };

        match instance.confirm_verification(response) {
            Ok(next) => {
                info!(workflow = %id, from = %instance.stage(), to = %next.stage(), "stage changed");
                *instance = next;
                Ok(instance.clone())
            }
            Err(e) => {
                warn!(workflow = %id, error = %e, "verification did not pass");
                Err(e)
            }
        }
    }

    /// Remote verification bounded by the policy timeout, with the local
    /// rules standing in when the service is slow or failing.
    async fn verify(&self, request: &VerificationRequest) -> VerificationResponse {
        let timeout = self.policy.verification_timeout();
        match tokio::time::timeout(timeout, self.verifier.verify(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "verification service failed, using local verification");
                fallback_verify(request)
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "verification service timed out, using local verification");
                fallback_verify(request)
            }
        }
    }

    pub async fn authorize(&self, id: WorkflowId, sign_off: Option<SupervisorSignOff>) -> Result<WorkflowInstance> {
        if let Some(s) = &sign_off {
            info!(workflow = %id, supervisor = %s.supervisor_id, "supervisor sign-off presented");
        }
        self.transition(id, "authorize", |i| i.authorize(sign_off))
            .await
    }

    pub async fn conclude_cross_sell(&self, id: WorkflowId, accepted: Vec<String>) -> Result<WorkflowInstance> {
        self.transition(id, "conclude cross-sell", |i| i.conclude_cross_sell(accepted))
            .await
    }

    /// Records feedback and discards the instance.
    pub async fn complete(&self, id: WorkflowId, feedback: Feedback) -> Result<()> {
        let session = self.session(id).await?;
        let instance = session.try_lock()?;
        instance.complete(&feedback)?;
        drop(instance);
        self.store.remove(id).await?;
        info!(workflow = %id, rating = feedback.rating, "workflow completed");
        Ok(())
    }

    /// Discards the instance without side effects. Any in-flight
    /// verification is aborted first.
    pub async fn cancel(&self, id: WorkflowId) -> Result<()> {
        let session = self.session(id).await?;
        let instance = match session.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                session.cancel();
                session.lock().await
            }
        };
        if let Err(e) = instance.cancel() {
            session.reset_cancel();
            warn!(workflow = %id, stage = %instance.stage(), "cancel refused");
            return Err(e);
        }
        session.cancel();
        drop(instance);
        self.store.remove(id).await?;
        info!(workflow = %id, "workflow cancelled");
        Ok(())
    }

    /// Asks the advisory service; never fails and never waits longer than
    /// the policy timeout.
    pub async fn advise(&self, prompt: &str) -> Advisory {
        let timeout = self.policy.advisory_timeout();
        match tokio::time::timeout(timeout, self.advisor.advise(prompt)).await {
            Ok(Ok(answer)) => Advisory::Suggestion(answer),
            Ok(Err(e)) => {
                warn!(error = %e, "advisory service failed");
                Advisory::Unavailable
            }
            Err(_) => {
                warn!("advisory service timed out");
                Advisory::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::fixtures::retail_profile;
    use crate::domain::ports::{Advisor, Verifier};
    use crate::infrastructure::in_memory::InMemorySessionStore;
    use crate::infrastructure::local::{LocalVerifier, RuleBasedAdvisor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct SlowVerifier(Duration);

    #[async_trait]
    impl Verifier for SlowVerifier {
        async fn verify(&self, request: &VerificationRequest) -> Result<VerificationResponse> {
            tokio::time::sleep(self.0).await;
            LocalVerifier.verify(request).await
        }
    }

    struct SilentAdvisor;

    #[async_trait]
    impl Advisor for SilentAdvisor {
        async fn advise(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    fn controller_with(verifier: VerifierBox, advisor: AdvisorBox) -> Arc<WorkflowController> {
        let policy = PolicyConfig {
            verification_timeout_ms: 200,
            advisory_timeout_ms: 50,
            ..PolicyConfig::default()
        };
        Arc::new(WorkflowController::new(
            Box::new(InMemorySessionStore::new()),
            verifier,
            advisor,
            policy,
        ))
    }

    fn controller() -> Arc<WorkflowController> {
        controller_with(Box::new(LocalVerifier), Box::new(RuleBasedAdvisor))
    }

    fn bill() -> Map<String, Value> {
        json!({
            "biller_code": "KPLC",
            "bill_reference": "449921",
            "source_account": "0100100002",
            "amount": "3500",
        })
        .as_object()
        .unwrap()
        .clone()
    }

    async fn at_verification(controller: &WorkflowController) -> WorkflowId {
        let id = controller
            .open(ServiceId::BillPayment, retail_profile())
            .await
            .unwrap();
        controller.submit_input(id, &bill()).await.unwrap();
        controller.proceed_to_processing(id).await.unwrap();
        controller.acknowledge_summary(id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_bill_payment_end_to_end() {
        let controller = controller();
        let id = at_verification(&controller).await;
        let verified = controller.confirm_verification(id).await.unwrap();
        assert_eq!(verified.stage(), Stage::Authorization);
        assert!(!verified.verification().unwrap().fallback);

        controller.authorize(id, None).await.unwrap();
        controller.conclude_cross_sell(id, vec![]).await.unwrap();
        controller
            .complete(id, Feedback { rating: 4, comment: None })
            .await
            .unwrap();
        assert!(matches!(
            controller.snapshot(id).await,
            Err(TellerError::WorkflowNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_verifier_falls_back() {
        let controller = controller_with(
            Box::new(SlowVerifier(Duration::from_secs(5))),
            Box::new(RuleBasedAdvisor),
        );
        let id = at_verification(&controller).await;
        let verified = controller.confirm_verification(id).await.unwrap();
        assert_eq!(verified.stage(), Stage::Authorization);
        assert!(verified.verification().unwrap().fallback);
    }

    #[tokio::test]
    async fn test_concurrent_operation_is_rejected() {
        let controller = controller_with(
            Box::new(SlowVerifier(Duration::from_millis(150))),
            Box::new(RuleBasedAdvisor),
        );
        let id = at_verification(&controller).await;

        let background = Arc::clone(&controller);
        let handle = tokio::spawn(async move { background.confirm_verification(id).await });
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(matches!(
            controller.with_notes(id, "second writer".to_string()).await,
            Err(TellerError::WorkflowBusy(_))
        ));
        assert_eq!(handle.await.unwrap().unwrap().stage(), Stage::Authorization);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_verification() {
        let controller = controller_with(
            Box::new(SlowVerifier(Duration::from_secs(5))),
            Box::new(RuleBasedAdvisor),
        );
        let id = at_verification(&controller).await;

        let background = Arc::clone(&controller);
        let handle = tokio::spawn(async move { background.confirm_verification(id).await });
        tokio::time::sleep(Duration::from_millis(30)).await;

        controller.cancel(id).await.unwrap();
        assert!(matches!(handle.await.unwrap(), Err(TellerError::Cancelled)));
        assert!(controller.active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_authorization_is_refused() {
        let controller = controller();
        let id = at_verification(&controller).await;
        controller.confirm_verification(id).await.unwrap();
        controller.authorize(id, None).await.unwrap();
        assert!(matches!(
            controller.cancel(id).await,
            Err(TellerError::AlreadyAuthorized)
        ));
        assert_eq!(controller.snapshot(id).await.unwrap().stage(), Stage::CrossSell);
    }

    #[tokio::test]
    async fn test_advisory_timeout_reports_unavailable() {
        let controller = controller_with(Box::new(LocalVerifier), Box::new(SilentAdvisor));
        assert_eq!(controller.advise("fx tips").await, Advisory::Unavailable);

        let controller = self::controller();
        assert!(matches!(
            controller.advise("customer wants a better fx rate").await,
            Advisory::Suggestion(_)
        ));
    }

    #[tokio::test]
    async fn test_unknown_workflow() {
        let controller = controller();
        let id = uuid::Uuid::new_v4();
        assert!(matches!(
            controller.proceed_to_processing(id).await,
            Err(TellerError::WorkflowNotFound(_))
        ));
    }
}
