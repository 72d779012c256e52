//! In-process stand-ins for the remote verification and advisory services.

use crate::domain::ports::{Advisor, Verifier};
use crate::domain::verification::{VerificationRequest, VerificationResponse, fallback_verify};
use crate::error::Result;
use async_trait::async_trait;

/// Runs the deterministic artefact rules in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalVerifier;

#[async_trait]
impl Verifier for LocalVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationResponse> {
        Ok(VerificationResponse {
            fallback: false,
            ..fallback_verify(request)
        })
    }
}

const RULES: &[(&[&str], &str)] = &[
    (
        &["fx", "rate", "exchange", "dollar", "usd"],
        "Customers holding an FX account get a narrower spread; suggest opening one if they exchange regularly.",
    ),
    (
        &["transfer", "rtgs", "pesalink", "eft"],
        "EFT is free for amounts up to KES 1,000,000; suggest PesaLink when the customer needs the funds today.",
    ),
    (
        &["kyc", "document", "id"],
        "Capture a clear image of every document; artefacts without images are flagged for review.",
    ),
    (
        &["overdraft", "limit", "card"],
        "Limit increases above policy thresholds need a supervisor; prepare the sign-off before authorization.",
    ),
];

/// Keyword-matched advice, for branches without the remote assistant.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedAdvisor;

#[async_trait]
impl Advisor for RuleBasedAdvisor {
    async fn advise(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_lowercase();
        let words: Vec<&str> = prompt
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let advice = RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| words.contains(k)))
            .map(|(_, advice)| *advice)
            .unwrap_or("Review the summary with the customer before requesting verification.");
        Ok(advice.to_string())
    }
}
