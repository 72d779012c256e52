//! Payment channel eligibility and recommendation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationType {
    SameBank,
    OtherBank,
    MobileWallet,
}

impl DestinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::SameBank => "same-bank",
            DestinationType::OtherBank => "other-bank",
            DestinationType::MobileWallet => "mobile-wallet",
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DestinationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "same-bank" => Ok(DestinationType::SameBank),
            "other-bank" => Ok(DestinationType::OtherBank),
            "mobile-wallet" => Ok(DestinationType::MobileWallet),
            other => Err(format!("unknown destination type '{other}'")),
        }
    }
}

/// Static description of a payment rail.
struct ChannelSpec {
    id: &'static str,
    name: &'static str,
    destinations: &'static [DestinationType],
    max_amount: Option<Decimal>,
    cost: Decimal,
    sla: &'static str,
    sla_minutes: u32,
    realtime: bool,
}

const CHANNELS: [ChannelSpec; 5] = [
    ChannelSpec {
        id: "internal-transfer",
        name: "Internal Transfer",
        destinations: &[DestinationType::SameBank],
        max_amount: None,
        cost: Decimal::ZERO,
        sla: "Instant",
        sla_minutes: 0,
        realtime: true,
    },
    ChannelSpec {
        id: "pesalink",
        name: "PesaLink",
        destinations: &[DestinationType::OtherBank],
        max_amount: Some(dec!(999999)),
        cost: dec!(45),
        sla: "Instant",
        sla_minutes: 1,
        realtime: true,
    },
    ChannelSpec {
        id: "rtgs",
        name: "RTGS",
        destinations: &[DestinationType::OtherBank],
        max_amount: None,
        cost: dec!(500),
        sla: "Within 2 hours",
        sla_minutes: 120,
        realtime: true,
    },
    ChannelSpec {
        id: "eft",
        name: "EFT (Batch Clearing)",
        destinations: &[DestinationType::OtherBank],
        max_amount: Some(dec!(1000000)),
        cost: Decimal::ZERO,
        sla: "1-2 business days",
        sla_minutes: 2880,
        realtime: false,
    },
    ChannelSpec {
        id: "mobile-wallet",
        name: "Mobile Wallet",
        destinations: &[DestinationType::MobileWallet],
        max_amount: Some(dec!(250000)),
        cost: dec!(30),
        sla: "Instant",
        sla_minutes: 1,
        realtime: true,
    },
];

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ChannelOption {
    pub id: String,
    pub name: String,
    pub cost: Decimal,
    pub sla: String,
    pub realtime: bool,
    pub eligibility: Eligibility,
    pub recommended: bool,
    #[serde(skip)]
    sla_minutes: u32,
}

impl ChannelOption {
    pub fn is_eligible(&self) -> bool {
        self.eligibility.eligible
    }

    /// Ordering key: free first, then fastest settlement, then realtime.
    fn friction(&self) -> (bool, u32, bool, Decimal) {
        (
            self.cost > Decimal::ZERO,
            self.sla_minutes,
            !self.realtime,
            self.cost,
        )
    }
}

fn evaluate(spec: &ChannelSpec, amount: Decimal, destination: DestinationType) -> Eligibility {
    if !spec.destinations.contains(&destination) {
        return Eligibility {
            eligible: false,
            reason: Some(format!("{} does not serve {destination} transfers", spec.name)),
        };
    }
    if let Some(max) = spec.max_amount
        && amount > max
    {
        return Eligibility {
            eligible: false,
            reason: Some(format!("Amount exceeds the {} maximum of KES {max}", spec.name)),
        };
    }
    Eligibility {
        eligible: true,
        reason: None,
    }
}

/// Evaluates every registered channel for a transfer.
///
/// All channels are returned in registry order; ineligible ones carry a
/// reason. At most one eligible channel is flagged `recommended`.
pub fn recommend_channels(amount: Decimal, destination: DestinationType) -> Vec<ChannelOption> {
    let mut options: Vec<ChannelOption> = CHANNELS
        .iter()
        .map(|spec| ChannelOption {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            cost: spec.cost,
            sla: spec.sla.to_string(),
            realtime: spec.realtime,
            eligibility: evaluate(spec, amount, destination),
            recommended: false,
            sla_minutes: spec.sla_minutes,
        })
        .collect();

    // min_by_key keeps the first of equal keys, so registry order breaks ties.
    let best = options
        .iter()
        .enumerate()
        .filter(|(_, option)| option.is_eligible())
        .min_by_key(|(_, option)| option.friction())
        .map(|(index, _)| index);

    if let Some(index) = best {
        options[index].recommended = true;
    }
    options
}

pub fn recommended(options: &[ChannelOption]) -> Option<&ChannelOption> {
    options.iter().find(|option| option.recommended)
}
