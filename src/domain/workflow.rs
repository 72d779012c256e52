//! The transaction workflow state machine.
//!
//! A `WorkflowInstance` is a value. Every transition borrows the current
//! instance and returns a new one, so a rejected operation leaves the
//! caller's copy untouched.
//!
//! ```text
//! input -> validation -> review -> processing -> verification -> authorization -> cross-sell -> feedback
//!   ^                      |                          |
//!   +---- request changes -+--------------------------+
//! ```
//!
//! `validation -> review` always happens inside `submit_input`, and
//! `processing -> verification` happens inside `proceed_to_processing` for
//! every service except the counter FX exchange, which waits for the rate
//! adjustment step.

use super::approval::{ApprovalReason, payload_escalation, rate_escalation};
use super::channels::{ChannelOption, recommend_channels, recommended};
use super::charges::{ChargeBreakdown, compute_charges};
use super::customer::CustomerProfile;
use super::rates::{RateCorridor, RateQuote, compute_dynamic_rate, rate_corridor};
use super::service::{
    DataBag, EligibilityContext, FieldErrors, ServiceId, ServicePayload, SummaryLine,
};
use super::verification::{VerificationRequest, VerificationResponse, build_request};
use crate::config::PolicyConfig;
use crate::error::{Result, TellerError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

pub type WorkflowId = Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Input,
    Validation,
    Review,
    Processing,
    Verification,
    Authorization,
    CrossSell,
    Feedback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Validation => "validation",
            Stage::Review => "review",
            Stage::Processing => "processing",
            Stage::Verification => "verification",
            Stage::Authorization => "authorization",
            Stage::CrossSell => "cross-sell",
            Stage::Feedback => "feedback",
        };
        f.write_str(name)
    }
}

/// Engine outputs attached to a validated request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Pricing {
    pub charges: ChargeBreakdown,
    pub quote: Option<RateQuote>,
    pub corridor: Option<RateCorridor>,
    /// The rate the customer is actually dealt at, once processing fixed it.
    pub final_rate: Option<Decimal>,
    pub channels: Vec<ChannelOption>,
    pub selected_channel: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct SupervisorSignOff {
    pub supervisor_id: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Feedback {
    /// 1 to 5.
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WorkflowInstance {
    id: WorkflowId,
    service: ServiceId,
    customer: CustomerProfile,
    stage: Stage,
    data_bag: DataBag,
    validation_errors: FieldErrors,
    officer_notes: Option<String>,
    approval_required: bool,
    approval_reasons: Vec<ApprovalReason>,
    /// A correction pass opened by `request_changes`; submitted fields may overwrite.
    reopened: bool,
    request: Option<ServicePayload>,
    pricing: Option<Pricing>,
    summary_confirmed: bool,
    verification: Option<VerificationResponse>,
    sign_off: Option<SupervisorSignOff>,
    accepted_offers: Vec<String>,
}

impl WorkflowInstance {
    pub fn open(service: ServiceId, customer: CustomerProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            customer,
            stage: Stage::Input,
            data_bag: DataBag::new(),
            validation_errors: FieldErrors::new(),
            officer_notes: None,
            approval_required: false,
            approval_reasons: Vec::new(),
            reopened: false,
            request: None,
            pricing: None,
            summary_confirmed: false,
            verification: None,
            sign_off: None,
            accepted_offers: Vec::new(),
        }
    }

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn service(&self) -> ServiceId {
        self.service
    }

    pub fn customer(&self) -> &CustomerProfile {
        &self.customer
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn data_bag(&self) -> &DataBag {
        &self.data_bag
    }

    pub fn validation_errors(&self) -> &FieldErrors {
        &self.validation_errors
    }

    pub fn officer_notes(&self) -> Option<&str> {
        self.officer_notes.as_deref()
    }

    pub fn approval_required(&self) -> bool {
        self.approval_required
    }

    pub fn approval_reasons(&self) -> &[ApprovalReason] {
        &self.approval_reasons
    }

    pub fn is_reopened(&self) -> bool {
        self.reopened
    }

    pub fn request(&self) -> Option<&ServicePayload> {
        self.request.as_ref()
    }

    pub fn pricing(&self) -> Option<&Pricing> {
        self.pricing.as_ref()
    }

    pub fn summary_confirmed(&self) -> bool {
        self.summary_confirmed
    }

    pub fn verification(&self) -> Option<&VerificationResponse> {
        self.verification.as_ref()
    }

    pub fn sign_off(&self) -> Option<&SupervisorSignOff> {
        self.sign_off.as_ref()
    }

    pub fn accepted_offers(&self) -> &[String] {
        &self.accepted_offers
    }

    fn expect_stage(&self, action: &'static str, allowed: &[Stage]) -> Result<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(TellerError::InvalidTransition {
                action,
                stage: self.stage,
            })
        }
    }

    /// Latches the approval flag. It is never cleared.
    fn escalate(&mut self, reason: ApprovalReason) {
        self.approval_required = true;
        if !self.approval_reasons.contains(&reason) {
            self.approval_reasons.push(reason);
        }
    }

    /// Captures input for the service and, if everything validates, prices
    /// the request and moves straight through validation to review.
    ///
    /// Fields that fail validation are kept out of the data bag and reported
    /// in `validation_errors`; the instance then stays in `input`. Outside a
    /// correction pass, fields already accepted are not overwritten.
    pub fn submit_input(&self, payload: &Map<String, Value>, policy: &PolicyConfig) -> Result<Self> {
        self.expect_stage("submit input", &[Stage::Input])?;
        let mut next = self.clone();

        let mut candidate = self.data_bag.clone();
        for (key, value) in payload {
            if self.reopened || !candidate.contains_key(key) {
                candidate.insert(key.clone(), value.clone());
            }
        }

        let (request, errors, pricing) = match ServicePayload::from_bag(self.service, &candidate) {
            Err(errors) => (None, errors, None),
            Ok(request) => {
                let charges = compute_charges(
                    self.service,
                    self.customer.segment(),
                    request.kes_amount(policy),
                );
                let ctx = EligibilityContext {
                    profile: &self.customer,
                    policy,
                    charges: &charges,
                };
                let errors = request.validate(&ctx);
                if errors.is_empty() {
                    match self.price(&request, charges, policy) {
                        Ok(pricing) => (Some(request), errors, Some(pricing)),
                        Err(errors) => (None, errors, None),
                    }
                } else {
                    (None, errors, None)
                }
            }
        };

        for key in errors.keys() {
            candidate.remove(key);
        }
        next.data_bag = candidate;
        next.validation_errors = errors;

        let (Some(request), Some(pricing)) = (request, pricing) else {
            return Ok(next);
        };

        next.stage = Stage::Validation;
        if let Some(reason) = payload_escalation(&request, policy) {
            next.escalate(reason);
        }
        next.request = Some(request);
        next.pricing = Some(pricing);
        next.reopened = false;
        next.stage = Stage::Review;
        Ok(next)
    }

    fn price(
        &self,
        request: &ServicePayload,
        charges: ChargeBreakdown,
        policy: &PolicyConfig,
    ) -> std::result::Result<Pricing, FieldErrors> {
        let mut pricing = Pricing {
            charges,
            quote: None,
            corridor: None,
            final_rate: None,
            channels: Vec::new(),
            selected_channel: None,
        };

        match request {
            ServicePayload::DenominationExchange(form) => {
                let pair = policy.rates.get(&form.currency_pair).map_err(|e| {
                    FieldErrors::from([("currency_pair".to_string(), e.to_string())])
                })?;
                let kes_equivalent =
                    pair.kes_equivalent(form.foreign_amount.value()).ok_or_else(|| {
                        FieldErrors::from([(
                            "foreign_amount".to_string(),
                            "Amount is too large to convert".to_string(),
                        )])
                    })?;
                let quote = compute_dynamic_rate(
                    pair,
                    form.direction,
                    self.customer.segment(),
                    kes_equivalent,
                    &self.customer,
                );
                if !quote.is_offerable() {
                    return Err(FieldErrors::from([(
                        "foreign_amount".to_string(),
                        "Amount is too small to quote".to_string(),
                    )]));
                }
                pricing.corridor = Some(rate_corridor(&quote));
                pricing.quote = Some(quote);
            }
            ServicePayload::FundsTransfer(form) => {
                pricing.channels = recommend_channels(form.amount.value(), form.destination_type);
                pricing.selected_channel = form
                    .channel
                    .clone()
                    .or_else(|| recommended(&pricing.channels).map(|c| c.id.clone()));
            }
            _ => {}
        }
        Ok(pricing)
    }

    /// Sends the instance back to `input` for correction, keeping every
    /// captured field.
    pub fn request_changes(&self) -> Result<Self> {
        self.expect_stage("request changes", &[Stage::Review, Stage::Verification])?;
        let mut next = self.clone();
        next.stage = Stage::Input;
        next.reopened = true;
        next.request = None;
        next.pricing = None;
        next.summary_confirmed = false;
        next.verification = None;
        Ok(next)
    }

    pub fn proceed_to_processing(&self) -> Result<Self> {
        self.expect_stage("proceed to processing", &[Stage::Review])?;
        let mut next = self.clone();
        next.stage = Stage::Processing;
        if !self.service.is_fx() {
            next.stage = Stage::Verification;
        }
        Ok(next)
    }

    /// Fixes the dealt rate for an FX exchange. `None` accepts the system
    /// offered rate; any other rate must lie inside the corridor.
    pub fn adjust_rate(&self, officer_rate: Option<Decimal>, policy: &PolicyConfig) -> Result<Self> {
        self.expect_stage("adjust the rate", &[Stage::Processing])?;
        let (Some(quote), Some(corridor)) = (
            self.pricing.as_ref().and_then(|p| p.quote.as_ref()),
            self.pricing.as_ref().and_then(|p| p.corridor),
        ) else {
            return Err(TellerError::ValidationError(
                "No FX quote is attached to this workflow".to_string(),
            ));
        };

        let final_rate = match officer_rate {
            Some(rate) => corridor.check(rate)?,
            None => quote.offered_rate,
        };
        let escalation = rate_escalation(quote, officer_rate, policy.rate_epsilon);

        let mut next = self.clone();
        if let Some(reason) = escalation {
            next.escalate(reason);
        }
        if let Some(pricing) = next.pricing.as_mut() {
            pricing.final_rate = Some(final_rate);
        }
        next.stage = Stage::Verification;
        Ok(next)
    }

    /// The customer has read and accepted the summary.
    pub fn acknowledge_summary(&self) -> Result<Self> {
        self.expect_stage("acknowledge the summary", &[Stage::Verification])?;
        let mut next = self.clone();
        next.summary_confirmed = true;
        Ok(next)
    }

    /// Artefacts to send to the verification service. Only available once
    /// the customer has confirmed the summary.
    pub fn verification_request(&self) -> Result<VerificationRequest> {
        self.expect_stage("verify", &[Stage::Verification])?;
        if !self.summary_confirmed {
            return Err(TellerError::SummaryNotConfirmed);
        }
        let request = self.request.as_ref().ok_or_else(|| {
            TellerError::ValidationError("No validated request to verify".to_string())
        })?;
        Ok(build_request(request, &self.data_bag))
    }

    pub fn confirm_verification(&self, verification: VerificationResponse) -> Result<Self> {
        self.expect_stage("confirm verification", &[Stage::Verification])?;
        if !self.summary_confirmed {
            return Err(TellerError::SummaryNotConfirmed);
        }
        if !verification.passed() {
            let failures: Vec<String> = verification
                .failures()
                .map(|f| format!("{}: {}", f.artefact_id, f.message))
                .collect();
            return Err(TellerError::VerificationFailed(failures.join("; ")));
        }
        let mut next = self.clone();
        next.verification = Some(verification);
        next.stage = Stage::Authorization;
        Ok(next)
    }

    /// Authorizes the transaction. There is no way back from here.
    pub fn authorize(&self, sign_off: Option<SupervisorSignOff>) -> Result<Self> {
        self.expect_stage("authorize", &[Stage::Authorization])?;
        if let Some(s) = &sign_off
            && s.supervisor_id.trim().is_empty()
        {
            return Err(TellerError::ValidationError(
                "Supervisor sign-off needs a supervisor id".to_string(),
            ));
        }
        if self.approval_required && sign_off.is_none() {
            let reasons: Vec<String> = self.approval_reasons.iter().map(|r| r.to_string()).collect();
            return Err(TellerError::SupervisorSignOffRequired(reasons.join("; ")));
        }
        let mut next = self.clone();
        next.sign_off = sign_off;
        next.stage = Stage::CrossSell;
        Ok(next)
    }

    pub fn conclude_cross_sell(&self, accepted_offers: Vec<String>) -> Result<Self> {
        self.expect_stage("conclude cross-sell", &[Stage::CrossSell])?;
        let mut next = self.clone();
        next.accepted_offers = accepted_offers;
        next.stage = Stage::Feedback;
        Ok(next)
    }

    /// Checks the instance may be completed; it is discarded afterwards.
    pub fn complete(&self, feedback: &Feedback) -> Result<()> {
        self.expect_stage("complete", &[Stage::Feedback])?;
        if !(1..=5).contains(&feedback.rating) {
            return Err(TellerError::ValidationError(
                "Feedback rating must be between 1 and 5".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks the instance may be discarded without completion.
    pub fn cancel(&self) -> Result<()> {
        if self.stage >= Stage::CrossSell {
            return Err(TellerError::AlreadyAuthorized);
        }
        Ok(())
    }

    pub fn with_notes(&self, notes: impl Into<String>) -> Result<Self> {
        if self.stage == Stage::Feedback {
            return Err(TellerError::InvalidTransition {
                action: "edit notes",
                stage: self.stage,
            });
        }
        let notes = notes.into();
        let mut next = self.clone();
        next.officer_notes = (!notes.trim().is_empty()).then_some(notes);
        Ok(next)
    }

    /// Read model for display: captured fields, then pricing and approval.
    pub fn summary(&self) -> Vec<SummaryLine> {
        let mut lines = self.service.to_summary(&self.data_bag);

        if let Some(pricing) = &self.pricing {
            if let Some(quote) = &pricing.quote {
                lines.push(SummaryLine::new("Mid rate", quote.mid_rate.to_string()));
                lines.push(SummaryLine::new("Offered rate", quote.offered_rate.to_string()));
                lines.push(SummaryLine::new("KES equivalent", quote.kes_equivalent.to_string()));
            }
            if let Some(rate) = pricing.final_rate {
                lines.push(SummaryLine::new("Final rate", rate.to_string()));
            }
            if let Some(channel) = pricing
                .selected_channel
                .as_ref()
                .and_then(|id| pricing.channels.iter().find(|c| &c.id == id))
            {
                lines.push(SummaryLine::new("Payment channel", channel.name.clone()));
                lines.push(SummaryLine::new("Channel fee", channel.cost.to_string()));
            }
            let charges = &pricing.charges;
            lines.push(SummaryLine::new("Service fee", charges.service_fee.to_string()));
            lines.push(SummaryLine::new("Excise duty", charges.excise_duty.to_string()));
            lines.push(SummaryLine::new("VAT", charges.vat.to_string()));
            lines.push(SummaryLine::new("Total charges", charges.total_charges.to_string()));
        }

        if self.approval_required {
            let reasons: Vec<String> = self.approval_reasons.iter().map(|r| r.to_string()).collect();
            lines.push(SummaryLine::new("Supervisor approval", reasons.join("; ")));
        }
        if let Some(notes) = &self.officer_notes {
            lines.push(SummaryLine::new("Officer notes", notes.clone()));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::fixtures::retail_profile;
    use crate::domain::verification::fallback_verify;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn transfer() -> Map<String, Value> {
        payload(json!({
            "source_account": "0100100001",
            "destination_type": "other-bank",
            "destination_account": "99887766",
            "beneficiary_name": "Otieno Traders",
            "amount": "20000",
        }))
    }

    fn fx() -> Map<String, Value> {
        payload(json!({
            "currency_pair": "USD/KES",
            "direction": "buy",
            "foreign_amount": "1000",
        }))
    }

    fn at_review(service: ServiceId, input: Map<String, Value>) -> WorkflowInstance {
        WorkflowInstance::open(service, retail_profile())
            .submit_input(&input, &PolicyConfig::default())
            .unwrap()
    }

    fn verified(instance: &WorkflowInstance) -> WorkflowInstance {
        let confirmed = instance.acknowledge_summary().unwrap();
        let response = fallback_verify(&confirmed.verification_request().unwrap());
        confirmed.confirm_verification(response).unwrap()
    }

    #[test]
    fn test_open_starts_empty_in_input() {
        let instance = WorkflowInstance::open(ServiceId::BillPayment, retail_profile());
        assert_eq!(instance.stage(), Stage::Input);
        assert!(instance.data_bag().is_empty());
        assert!(!instance.approval_required());
    }

    #[test]
    fn test_valid_input_advances_to_review() {
        let instance = at_review(ServiceId::FundsTransfer, transfer());
        assert_eq!(instance.stage(), Stage::Review);
        assert!(instance.validation_errors().is_empty());
        let pricing = instance.pricing().unwrap();
        assert_eq!(pricing.selected_channel.as_deref(), Some("eft"));
        assert_eq!(pricing.charges.service_fee, dec!(50));
    }

    #[test]
    fn test_partial_input_keeps_valid_fields_only() {
        let mut input = transfer();
        input.insert("amount".to_string(), json!("abc"));
        let original = WorkflowInstance::open(ServiceId::FundsTransfer, retail_profile());
        let instance = original
            .submit_input(&input, &PolicyConfig::default())
            .unwrap();
        assert_eq!(instance.stage(), Stage::Input);
        assert!(instance.validation_errors().contains_key("amount"));
        assert!(!instance.data_bag().contains_key("amount"));
        assert_eq!(instance.data_bag().len(), 4);
        // The original value is untouched.
        assert!(original.data_bag().is_empty());

        let fixed = instance
            .submit_input(&payload(json!({"amount": "20000"})), &PolicyConfig::default())
            .unwrap();
        assert_eq!(fixed.stage(), Stage::Review);
        assert!(fixed.validation_errors().is_empty());
    }

    #[test]
    fn test_out_of_range_amounts_stay_in_input() {
        let mut input = transfer();
        input.insert("amount".to_string(), json!("79228162514264337593543950335"));
        let instance = WorkflowInstance::open(ServiceId::FundsTransfer, retail_profile())
            .submit_input(&input, &PolicyConfig::default())
            .unwrap();
        assert_eq!(instance.stage(), Stage::Input);
        assert!(instance.validation_errors().contains_key("amount"));
        assert!(!instance.data_bag().contains_key("amount"));

        let mut input = fx();
        input.insert(
            "foreign_amount".to_string(),
            json!("1000000000000000000000000000"),
        );
        let instance = WorkflowInstance::open(ServiceId::DenominationExchange, retail_profile())
            .submit_input(&input, &PolicyConfig::default())
            .unwrap();
        assert_eq!(instance.stage(), Stage::Input);
        assert_eq!(
            instance.validation_errors()["foreign_amount"],
            "Amount is too large to convert"
        );
        assert!(instance.pricing().is_none());
    }

    #[test]
    fn test_accepted_fields_are_not_overwritten_outside_correction() {
        let mut input = transfer();
        input.remove("beneficiary_name");
        let instance = WorkflowInstance::open(ServiceId::FundsTransfer, retail_profile())
            .submit_input(&input, &PolicyConfig::default())
            .unwrap();
        let next = instance
            .submit_input(
                &payload(json!({"beneficiary_name": "Otieno", "amount": "1"})),
                &PolicyConfig::default(),
            )
            .unwrap();
        assert_eq!(next.data_bag()["amount"], json!("20000"));
        assert_eq!(next.stage(), Stage::Review);
    }

    #[test]
    fn test_request_changes_keeps_bag_and_allows_correction() {
        let instance = at_review(ServiceId::FundsTransfer, transfer());
        let reopened = instance.request_changes().unwrap();
        assert_eq!(reopened.stage(), Stage::Input);
        assert!(reopened.is_reopened());
        assert_eq!(reopened.data_bag(), instance.data_bag());

        let corrected = reopened
            .submit_input(&payload(json!({"amount": "30000"})), &PolicyConfig::default())
            .unwrap();
        assert_eq!(corrected.stage(), Stage::Review);
        assert_eq!(corrected.data_bag()["amount"], json!("30000"));
        assert!(!corrected.is_reopened());
    }

    #[test]
    fn test_non_fx_auto_advances_to_verification() {
        let instance = at_review(ServiceId::FundsTransfer, transfer())
            .proceed_to_processing()
            .unwrap();
        assert_eq!(instance.stage(), Stage::Verification);
    }

    #[test]
    fn test_fx_waits_in_processing_for_rate() {
        let instance = at_review(ServiceId::DenominationExchange, fx())
            .proceed_to_processing()
            .unwrap();
        assert_eq!(instance.stage(), Stage::Processing);
        assert!(matches!(
            instance.acknowledge_summary(),
            Err(TellerError::InvalidTransition { .. })
        ));

        let accepted = instance.adjust_rate(None, &PolicyConfig::default()).unwrap();
        assert_eq!(accepted.stage(), Stage::Verification);
        assert_eq!(accepted.pricing().unwrap().final_rate, Some(dec!(131.3918)));
        assert!(!accepted.approval_required());
    }

    #[test]
    fn test_improved_fx_rate_requires_approval() {
        let processing = at_review(ServiceId::DenominationExchange, fx())
            .proceed_to_processing()
            .unwrap();
        let adjusted = processing
            .adjust_rate(Some(dec!(131.00)), &PolicyConfig::default())
            .unwrap();
        assert!(adjusted.approval_required());

        let authorizing = verified(&adjusted);
        assert!(matches!(
            authorizing.authorize(None),
            Err(TellerError::SupervisorSignOffRequired(_))
        ));
        let signed = authorizing
            .authorize(Some(SupervisorSignOff {
                supervisor_id: "SUP-7".to_string(),
                note: None,
            }))
            .unwrap();
        assert_eq!(signed.stage(), Stage::CrossSell);
    }

    #[test]
    fn test_rate_outside_corridor_is_rejected() {
        let processing = at_review(ServiceId::DenominationExchange, fx())
            .proceed_to_processing()
            .unwrap();
        assert!(matches!(
            processing.adjust_rate(Some(dec!(129.45)), &PolicyConfig::default()),
            Err(TellerError::RateOutsideCorridor { .. })
        ));
        assert_eq!(processing.stage(), Stage::Processing);
    }

    #[test]
    fn test_approval_flag_survives_request_changes() {
        let adjusted = at_review(ServiceId::DenominationExchange, fx())
            .proceed_to_processing()
            .unwrap()
            .adjust_rate(Some(dec!(131.00)), &PolicyConfig::default())
            .unwrap();
        let reopened = adjusted.request_changes().unwrap();
        assert!(reopened.approval_required());
        let resubmitted = reopened
            .submit_input(&Map::new(), &PolicyConfig::default())
            .unwrap();
        assert!(resubmitted.approval_required());
        assert_eq!(resubmitted.approval_reasons().len(), 1);
    }

    #[test]
    fn test_verification_requires_customer_confirmation() {
        let instance = at_review(ServiceId::BillPayment, payload(json!({
            "biller_code": "KPLC",
            "bill_reference": "449921",
            "source_account": "0100100002",
            "amount": "3500",
        })))
        .proceed_to_processing()
        .unwrap();
        assert!(matches!(
            instance.verification_request(),
            Err(TellerError::SummaryNotConfirmed)
        ));
        assert!(matches!(
            instance.confirm_verification(VerificationResponse::default()),
            Err(TellerError::SummaryNotConfirmed)
        ));
    }

    #[test]
    fn test_full_lifecycle_without_approval() {
        let instance = verified(
            &at_review(ServiceId::FundsTransfer, transfer())
                .proceed_to_processing()
                .unwrap(),
        );
        assert_eq!(instance.stage(), Stage::Authorization);
        let done = instance
            .authorize(None)
            .unwrap()
            .conclude_cross_sell(vec!["fx-account".to_string()])
            .unwrap();
        assert_eq!(done.stage(), Stage::Feedback);
        assert!(matches!(done.cancel(), Err(TellerError::AlreadyAuthorized)));
        assert!(done.complete(&Feedback { rating: 0, comment: None }).is_err());
        assert!(done.complete(&Feedback { rating: 5, comment: None }).is_ok());
    }

    #[test]
    fn test_stages_cannot_be_skipped() {
        let instance = WorkflowInstance::open(ServiceId::FundsTransfer, retail_profile());
        assert!(matches!(
            instance.proceed_to_processing(),
            Err(TellerError::InvalidTransition { stage: Stage::Input, .. })
        ));
        assert!(instance.authorize(None).is_err());
        assert!(instance.request_changes().is_err());
        assert!(instance.cancel().is_ok());
    }

    #[test]
    fn test_high_value_transfer_escalates() {
        let mut profile = retail_profile();
        profile.accounts[0].balance = crate::domain::money::Balance::new(dec!(3000000));
        let mut input = transfer();
        input.insert("amount".to_string(), json!("1500000"));
        let instance = WorkflowInstance::open(ServiceId::FundsTransfer, profile)
            .submit_input(&input, &PolicyConfig::default())
            .unwrap();
        assert_eq!(instance.stage(), Stage::Review);
        assert!(instance.approval_required());
        assert_eq!(instance.pricing().unwrap().selected_channel.as_deref(), Some("rtgs"));
    }

    #[test]
    fn test_summary_includes_charges_and_notes() {
        let instance = at_review(ServiceId::FundsTransfer, transfer())
            .with_notes("Customer in a hurry")
            .unwrap();
        let summary = instance.summary();
        let find = |label: &str| {
            summary
                .iter()
                .find(|l| l.label == label)
                .map(|l| l.value.clone())
        };
        assert_eq!(find("Amount").as_deref(), Some("20000"));
        assert_eq!(find("Payment channel").as_deref(), Some("EFT (Batch Clearing)"));
        assert_eq!(find("Total charges").as_deref(), Some("69.60"));
        assert_eq!(find("Officer notes").as_deref(), Some("Customer in a hurry"));
    }
}
