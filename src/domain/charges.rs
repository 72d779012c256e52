//! Tiered service charges.
//!
//! The base fee comes from a `{service, segment}` rule table. Excise duty is
//! levied on the fee, and VAT on fee plus duty.

use super::customer::Segment;
use super::money::round_money;
use super::service::ServiceId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const EXCISE_DUTY_RATE: Decimal = dec!(0.20);
pub const VAT_RATE: Decimal = dec!(0.16);

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
pub struct ChargeBreakdown {
    pub service_fee: Decimal,
    pub excise_duty: Decimal,
    pub vat: Decimal,
    pub total_charges: Decimal,
}

impl ChargeBreakdown {
    fn from_fee(fee: Decimal) -> Self {
        let service_fee = round_money(fee.max(Decimal::ZERO));
        let excise_duty = round_money(service_fee * EXCISE_DUTY_RATE);
        let vat = round_money((service_fee + excise_duty) * VAT_RATE);
        Self {
            service_fee,
            excise_duty,
            vat,
            total_charges: service_fee + excise_duty + vat,
        }
    }

    pub fn is_waived(&self) -> bool {
        self.total_charges.is_zero()
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum FeeRule {
    Waived,
    Flat(Decimal),
    /// Percentage of the amount, clamped to `[min, max]`.
    Percent {
        rate: Decimal,
        min: Decimal,
        max: Decimal,
    },
}

impl FeeRule {
    fn fee(&self, amount: Option<Decimal>) -> Decimal {
        match *self {
            FeeRule::Waived => Decimal::ZERO,
            FeeRule::Flat(fee) => fee,
            // Without an amount only the minimum can be charged.
            FeeRule::Percent { rate, min, max } => match amount {
                Some(amount) => (amount.max(Decimal::ZERO) * rate).clamp(min, max),
                None => min,
            },
        }
    }
}

pub fn fee_rule(service: ServiceId, segment: Segment) -> FeeRule {
    use FeeRule::*;
    use Segment::*;

    match (service, segment) {
        (ServiceId::KycUpdate | ServiceId::AccountModification, _) => Waived,
        (_, HighValue) => Waived,

        (ServiceId::FundsTransfer, Retail) => Percent {
            rate: dec!(0.001),
            min: dec!(50),
            max: dec!(1000),
        },
        (ServiceId::FundsTransfer, YoungProfessional) => Percent {
            rate: dec!(0.001),
            min: dec!(30),
            max: dec!(1000),
        },
        (ServiceId::FundsTransfer, Sme) => Percent {
            rate: dec!(0.0008),
            min: dec!(50),
            max: dec!(800),
        },

        (ServiceId::DenominationExchange, Retail) => Percent {
            rate: dec!(0.0025),
            min: dec!(100),
            max: dec!(5000),
        },
        (ServiceId::DenominationExchange, YoungProfessional) => Percent {
            rate: dec!(0.002),
            min: dec!(100),
            max: dec!(5000),
        },
        (ServiceId::DenominationExchange, Sme) => Percent {
            rate: dec!(0.0015),
            min: dec!(100),
            max: dec!(4000),
        },

        (ServiceId::BillPayment, Sme) => Flat(dec!(25)),
        (ServiceId::BillPayment, _) => Flat(dec!(30)),

        (ServiceId::CardServices, Sme) => Flat(dec!(250)),
        (ServiceId::CardServices, _) => Flat(dec!(300)),

        (ServiceId::StandingOrder, Retail) => Flat(dec!(100)),
        (ServiceId::StandingOrder, YoungProfessional) => Flat(dec!(75)),
        (ServiceId::StandingOrder, Sme) => Flat(dec!(50)),

        (ServiceId::ServiceRequest, Retail) => Flat(dec!(200)),
        (ServiceId::ServiceRequest, _) => Flat(dec!(150)),
    }
}

/// Computes the full charge breakdown. Amount-sensitive rules read `amount`.
pub fn compute_charges(
    service: ServiceId,
    segment: Segment,
    amount: Option<Decimal>,
) -> ChargeBreakdown {
    ChargeBreakdown::from_fee(fee_rule(service, segment).fee(amount))
}
