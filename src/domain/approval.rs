//! Escalation to supervisor authorization.
//!
//! Every predicate here is a side-effect-free comparison against a policy
//! threshold. The workflow latches the result: once an instance needs
//! approval it keeps needing it.

use super::rates::RateQuote;
use super::service::{CardAction, Modification, ServicePayload};
use crate::config::PolicyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ApprovalReason {
    OfficerRateOverride { offered: Decimal, applied: Decimal },
    HighValuePayment { amount: Decimal, threshold: Decimal },
    CardLimitChange { new_limit: Decimal, threshold: Decimal },
    OverdraftLimitChange { new_limit: Decimal, threshold: Decimal },
}

impl fmt::Display for ApprovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalReason::OfficerRateOverride { offered, applied } => write!(
                f,
                "officer rate {applied} differs from the system rate {offered}"
            ),
            ApprovalReason::HighValuePayment { amount, threshold } => write!(
                f,
                "payment of KES {amount} is at or above the KES {threshold} approval threshold"
            ),
            ApprovalReason::CardLimitChange {
                new_limit,
                threshold,
            } => write!(
                f,
                "POS limit of KES {new_limit} exceeds the KES {threshold} threshold"
            ),
            ApprovalReason::OverdraftLimitChange {
                new_limit,
                threshold,
            } => write!(
                f,
                "overdraft limit of KES {new_limit} exceeds the KES {threshold} threshold"
            ),
        }
    }
}

/// True iff the officer moved the rate away from the system offered rate.
pub fn requires_approval(quote: &RateQuote, officer_rate: Option<Decimal>, epsilon: Decimal) -> bool {
    rate_escalation(quote, officer_rate, epsilon).is_some()
}

pub fn rate_escalation(
    quote: &RateQuote,
    officer_rate: Option<Decimal>,
    epsilon: Decimal,
) -> Option<ApprovalReason> {
    let applied = officer_rate?;
    ((applied - quote.offered_rate).abs() > epsilon).then(|| ApprovalReason::OfficerRateOverride {
        offered: quote.offered_rate,
        applied,
    })
}

/// Service-specific escalation evaluated when input is accepted.
pub fn payload_escalation(payload: &ServicePayload, policy: &PolicyConfig) -> Option<ApprovalReason> {
    match payload {
        ServicePayload::FundsTransfer(form) => {
            high_value(form.amount.value(), policy.high_value_payment_threshold)
        }
        ServicePayload::BillPayment(form) => {
            high_value(form.amount.value(), policy.high_value_payment_threshold)
        }
        ServicePayload::CardServices(form) if form.action == CardAction::LimitChange => {
            let new_limit = form.new_limit?.value();
            let threshold = policy.card_limit_approval_threshold;
            (new_limit > threshold).then_some(ApprovalReason::CardLimitChange {
                new_limit,
                threshold,
            })
        }
        ServicePayload::AccountModification(form)
            if form.modification == Modification::OverdraftLimit =>
        {
            let new_limit = form.new_overdraft_limit?.value();
            let threshold = policy.overdraft_limit_approval_threshold;
            (new_limit > threshold).then_some(ApprovalReason::OverdraftLimitChange {
                new_limit,
                threshold,
            })
        }
        _ => None,
    }
}

fn high_value(amount: Decimal, threshold: Decimal) -> Option<ApprovalReason> {
    (amount >= threshold).then_some(ApprovalReason::HighValuePayment { amount, threshold })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::Segment;
    use crate::domain::customer::fixtures::retail_profile;
    use crate::domain::money::Amount;
    use crate::domain::rates::{Direction, RateBook, compute_dynamic_rate};
    use crate::domain::service::CardServices;
    use rust_decimal_macros::dec;

    fn quote() -> RateQuote {
        let book = RateBook::standard();
        compute_dynamic_rate(
            book.get("USD/KES").unwrap(),
            Direction::Buy,
            Segment::Retail,
            dec!(129450),
            &retail_profile(),
        )
    }

    #[test]
    fn test_no_officer_rate_needs_no_approval() {
        assert!(!requires_approval(&quote(), None, dec!(0.0001)));
    }

    #[test]
    fn test_rate_within_epsilon_is_noise() {
        let q = quote();
        assert!(!requires_approval(&q, Some(q.offered_rate + dec!(0.00005)), dec!(0.0001)));
        assert!(!requires_approval(&q, Some(q.offered_rate), dec!(0.0001)));
    }

    #[test]
    fn test_improved_rate_needs_approval() {
        let q = quote();
        let reason = rate_escalation(&q, Some(dec!(131.00)), dec!(0.0001)).unwrap();
        assert_eq!(
            reason,
            ApprovalReason::OfficerRateOverride {
                offered: dec!(131.3918),
                applied: dec!(131.00)
            }
        );
    }

    #[test]
    fn test_card_limit_escalation() {
        let policy = PolicyConfig::default();
        let payload = |limit| {
            ServicePayload::CardServices(CardServices {
                card_last4: "4821".to_string(),
                action: CardAction::LimitChange,
                new_limit: Some(Amount::new(limit).unwrap()),
            })
        };
        assert!(payload_escalation(&payload(dec!(500000)), &policy).is_none());
        assert!(matches!(
            payload_escalation(&payload(dec!(500001)), &policy),
            Some(ApprovalReason::CardLimitChange { .. })
        ));
    }
}
