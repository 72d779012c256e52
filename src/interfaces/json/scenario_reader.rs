use crate::domain::customer::CustomerProfile;
use crate::domain::service::ServiceId;
use crate::domain::workflow::{Feedback, SupervisorSignOff};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Read;

/// A scripted teller session: the customer, the service, and what the
/// officer and customer do at each stage.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub service: ServiceId,
    pub customer: CustomerProfile,
    /// Successive input submissions, in order.
    pub inputs: Vec<Map<String, Value>>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Officer rate for an FX exchange; absent accepts the offered rate.
    #[serde(default)]
    pub officer_rate: Option<Decimal>,
    #[serde(default)]
    pub sign_off: Option<SupervisorSignOff>,
    #[serde(default)]
    pub accepted_offers: Vec<String>,
    #[serde(default = "default_feedback")]
    pub feedback: Feedback,
}

fn default_feedback() -> Feedback {
    Feedback {
        rating: 5,
        comment: None,
    }
}

/// Reads a scenario document from any `Read` source.
pub struct ScenarioReader<R: Read> {
    source: R,
}

impl<R: Read> ScenarioReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn scenario(self) -> Result<Scenario> {
        Ok(serde_json::from_reader(self.source)?)
    }
}
