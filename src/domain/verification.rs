//! Artefact verification wire types and the local fallback verifier.

use super::service::{DataBag, ServicePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Artefact {
    pub id: String,
    pub action: String,
    pub fields: BTreeMap<String, String>,
    pub has_images: bool,
    pub biometric_data: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub artefacts: Vec<Artefact>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ArtefactResult {
    pub artefact_id: String,
    pub status: VerificationStatus,
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub results: Vec<ArtefactResult>,
    /// Set when the result was computed locally instead of by the remote service.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl VerificationResponse {
    pub fn failures(&self) -> impl Iterator<Item = &ArtefactResult> {
        self.results
            .iter()
            .filter(|r| r.status == VerificationStatus::Fail)
    }

    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn worst_status(&self) -> VerificationStatus {
        self.results
            .iter()
            .map(|r| r.status)
            .max()
            .unwrap_or(VerificationStatus::Pass)
    }
}

fn flatten(bag: &DataBag) -> BTreeMap<String, String> {
    bag.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// Builds the artefacts to verify for a validated request.
///
/// Every transaction is verified as a whole; KYC documents are verified
/// individually on top of that.
pub fn build_request(payload: &ServicePayload, bag: &DataBag) -> VerificationRequest {
    let mut artefacts = vec![Artefact {
        id: "transaction".to_string(),
        action: payload.service().to_string(),
        fields: flatten(bag),
        has_images: false,
        biometric_data: false,
    }];
    if let ServicePayload::KycUpdate(form) = payload {
        artefacts.extend(form.documents.iter().map(|doc| Artefact {
            id: doc.id.clone(),
            action: doc.kind.clone(),
            fields: doc.fields.clone(),
            has_images: doc.has_images,
            biometric_data: doc.biometric_data,
        }));
    }
    VerificationRequest { artefacts }
}

fn verify_artefact(artefact: &Artefact) -> ArtefactResult {
    let mut details = Vec::new();

    let empty: Vec<&String> = artefact
        .fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();
    for key in &empty {
        details.push(format!("Field '{key}' is empty"));
    }

    if artefact.action == "national-id"
        && let Some(number) = artefact.fields.get("id_number")
        && !(6..=9).contains(&number.len())
    {
        details.push("ID number must have 6 to 9 digits".to_string());
        return result(artefact, VerificationStatus::Fail, "ID number is malformed", details);
    }

    if !empty.is_empty() {
        return result(artefact, VerificationStatus::Fail, "Required information is missing", details);
    }

    let is_document = artefact.id != "transaction";
    if is_document && !artefact.has_images {
        details.push("No document image captured".to_string());
    }
    if artefact.action == "biometric" && !artefact.biometric_data {
        details.push("No biometric sample captured".to_string());
    }

    if details.is_empty() {
        result(artefact, VerificationStatus::Pass, "Verified", details)
    } else {
        result(artefact, VerificationStatus::Warning, "Verified with warnings", details)
    }
}

fn result(
    artefact: &Artefact,
    status: VerificationStatus,
    message: &str,
    details: Vec<String>,
) -> ArtefactResult {
    ArtefactResult {
        artefact_id: artefact.id.clone(),
        status,
        message: message.to_string(),
        details,
    }
}

/// Deterministic local verification used when the remote service is unavailable.
pub fn fallback_verify(request: &VerificationRequest) -> VerificationResponse {
    VerificationResponse {
        results: request.artefacts.iter().map(verify_artefact).collect(),
        fallback: true,
    }
}
