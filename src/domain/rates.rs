//! Dynamic FX pricing.
//!
//! A quote starts from the registry's mid-market rate and base spread, then
//! narrows the spread by three independent discount factors: customer
//! segment, deal volume (in KES) and relationship engagement. The resulting
//! quote also defines the corridor inside which a teller may improve the
//! rate by hand.

use super::customer::{CustomerProfile, Segment};
use super::money::round_money;
use crate::error::{Result, TellerError};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

const BPS_PER_UNIT: Decimal = dec!(10000);
const ENGAGEMENT_FX_DISCOUNT: Decimal = dec!(0.10);
const ENGAGEMENT_BREADTH_DISCOUNT: Decimal = dec!(0.05);
const ENGAGEMENT_FLOOR: Decimal = dec!(0.60);
const ENGAGEMENT_BREADTH_ACCOUNTS: usize = 4;

/// Volume tiers as `(minimum KES equivalent, multiplier)`, largest first.
const VOLUME_TIERS: [(Decimal, Decimal); 4] = [
    (dec!(5000000), dec!(0.50)),
    (dec!(2000000), dec!(0.65)),
    (dec!(1000000), dec!(0.80)),
    (dec!(500000), dec!(0.90)),
];

fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Customer buys the foreign currency; the bank marks the rate up.
    Buy,
    /// Customer sells the foreign currency; the bank marks the rate down.
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// A registry entry: the mid-market rate and base spread for one pair.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PairRate {
    /// `BASE/QUOTE`, e.g. `USD/KES`.
    pub pair: String,
    pub mid: Decimal,
    pub base_spread_bps: Decimal,
}

impl PairRate {
    pub fn new(pair: &str, mid: Decimal, base_spread_bps: Decimal) -> Self {
        Self {
            pair: pair.to_string(),
            mid,
            base_spread_bps,
        }
    }

    /// Converts an amount of the base currency at mid-market. `None` when
    /// the product does not fit in a `Decimal`.
    pub fn kes_equivalent(&self, foreign_amount: Decimal) -> Option<Decimal> {
        foreign_amount.checked_mul(self.mid).map(round_money)
    }
}

/// The fixed registry of tradeable currency pairs.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(transparent)]
pub struct RateBook {
    pairs: Vec<PairRate>,
}

impl Default for RateBook {
    fn default() -> Self {
        Self::standard()
    }
}

impl RateBook {
    pub fn new(pairs: Vec<PairRate>) -> Self {
        Self { pairs }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            PairRate::new("USD/KES", dec!(129.45), dec!(150)),
            PairRate::new("EUR/KES", dec!(140.85), dec!(175)),
            PairRate::new("GBP/KES", dec!(164.30), dec!(200)),
            PairRate::new("AED/KES", dec!(35.25), dec!(250)),
            PairRate::new("ZAR/KES", dec!(7.10), dec!(300)),
        ])
    }

    pub fn get(&self, pair: &str) -> Result<&PairRate> {
        self.pairs
            .iter()
            .find(|p| p.pair.eq_ignore_ascii_case(pair))
            .ok_or_else(|| TellerError::UnknownCurrencyPair(pair.to_string()))
    }

    pub fn pairs(&self) -> &[PairRate] {
        &self.pairs
    }
}

/// A priced FX quote.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RateQuote {
    pub pair: String,
    pub direction: Direction,
    pub mid_rate: Decimal,
    pub base_spread_bps: Decimal,
    pub effective_spread_bps: Decimal,
    pub offered_rate: Decimal,
    pub segment_multiplier: Decimal,
    pub volume_multiplier: Decimal,
    pub engagement_multiplier: Decimal,
    pub kes_equivalent: Decimal,
}

impl RateQuote {
    /// Spread as a fraction of the mid rate.
    pub fn spread_fraction(&self) -> Decimal {
        self.effective_spread_bps / BPS_PER_UNIT
    }

    /// A quote for a zero-sized deal must not be shown to the customer.
    pub fn is_offerable(&self) -> bool {
        self.kes_equivalent > Decimal::ZERO
    }
}

/// The band inside which a teller may set the final rate.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct RateCorridor {
    pub min_rate: Decimal,
    pub max_rate: Decimal,
}

impl RateCorridor {
    pub fn contains(&self, rate: Decimal) -> bool {
        rate >= self.min_rate && rate <= self.max_rate
    }

    /// Returns the rate unchanged if it lies inside the corridor.
    pub fn check(&self, rate: Decimal) -> Result<Decimal> {
        if self.contains(rate) {
            Ok(rate)
        } else {
            Err(TellerError::RateOutsideCorridor {
                rate,
                min: self.min_rate,
                max: self.max_rate,
            })
        }
    }
}

pub fn segment_multiplier(segment: Segment) -> Decimal {
    match segment {
        Segment::HighValue => dec!(0.35),
        Segment::Sme => dec!(0.60),
        Segment::YoungProfessional => dec!(0.80),
        Segment::Retail => dec!(1.00),
    }
}

pub fn volume_multiplier(kes_equivalent: Decimal) -> Decimal {
    VOLUME_TIERS
        .iter()
        .find(|(floor, _)| kes_equivalent >= *floor)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(Decimal::ONE)
}

pub fn engagement_multiplier(profile: &CustomerProfile) -> Decimal {
    let mut multiplier = Decimal::ONE;
    if profile.has_fx_account() {
        multiplier -= ENGAGEMENT_FX_DISCOUNT;
    }
    if profile.account_count() >= ENGAGEMENT_BREADTH_ACCOUNTS {
        multiplier -= ENGAGEMENT_BREADTH_DISCOUNT;
    }
    multiplier.max(ENGAGEMENT_FLOOR)
}

/// Prices a deal. The segment is passed explicitly so that callers may
/// quote for a segment other than the profile's derived one.
pub fn compute_dynamic_rate(
    pair: &PairRate,
    direction: Direction,
    segment: Segment,
    kes_equivalent: Decimal,
    profile: &CustomerProfile,
) -> RateQuote {
    let segment_multiplier = segment_multiplier(segment);
    let volume_multiplier = volume_multiplier(kes_equivalent);
    let engagement_multiplier = engagement_multiplier(profile);

    let effective_spread_bps = (pair.base_spread_bps
        * segment_multiplier
        * volume_multiplier
        * engagement_multiplier)
        .max(Decimal::ZERO);

    let mid_rate = round_money(pair.mid);
    let spread = effective_spread_bps / BPS_PER_UNIT;
    let offered_rate = match direction {
        Direction::Buy => round_rate(mid_rate * (Decimal::ONE + spread)),
        Direction::Sell => round_rate(mid_rate * (Decimal::ONE - spread)),
    };

    RateQuote {
        pair: pair.pair.clone(),
        direction,
        mid_rate,
        base_spread_bps: pair.base_spread_bps,
        effective_spread_bps,
        offered_rate,
        segment_multiplier,
        volume_multiplier,
        engagement_multiplier,
        kes_equivalent,
    }
}

/// The officer may give away at most half of the spread. The far bound is
/// rounded toward the offered rate so it never passes the exact half.
pub fn rate_corridor(quote: &RateQuote) -> RateCorridor {
    let half_spread = quote.spread_fraction() / dec!(2);
    match quote.direction {
        Direction::Buy => RateCorridor {
            min_rate: (quote.offered_rate * (Decimal::ONE - half_spread))
                .round_dp_with_strategy(4, RoundingStrategy::ToPositiveInfinity),
            max_rate: quote.offered_rate,
        },
        Direction::Sell => RateCorridor {
            min_rate: quote.offered_rate,
            max_rate: (quote.offered_rate * (Decimal::ONE + half_spread))
                .round_dp_with_strategy(4, RoundingStrategy::ToNegativeInfinity),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::AccountType;
    use crate::domain::customer::fixtures::{account, profile, retail_profile};

    fn usd() -> PairRate {
        RateBook::standard().get("USD/KES").unwrap().clone()
    }

    #[test]
    fn test_retail_buy_scenario() {
        let quote = compute_dynamic_rate(
            &usd(),
            Direction::Buy,
            Segment::Retail,
            dec!(129450),
            &retail_profile(),
        );
        assert_eq!(quote.mid_rate, dec!(129.45));
        assert_eq!(quote.volume_multiplier, dec!(1));
        assert_eq!(quote.engagement_multiplier, dec!(1));
        assert_eq!(quote.effective_spread_bps, dec!(150));
        assert_eq!(quote.offered_rate, dec!(131.3918));
    }

    #[test]
    fn test_high_value_buy_scenario() {
        let quote = compute_dynamic_rate(
            &usd(),
            Direction::Buy,
            Segment::HighValue,
            dec!(129450),
            &retail_profile(),
        );
        assert_eq!(quote.effective_spread_bps, dec!(52.5));
        assert_eq!(quote.offered_rate, dec!(130.1296));
    }

    #[test]
    fn test_sell_marks_rate_down() {
        let quote = compute_dynamic_rate(
            &usd(),
            Direction::Sell,
            Segment::Retail,
            dec!(129450),
            &retail_profile(),
        );
        assert_eq!(quote.offered_rate, dec!(127.5083));
        assert!(quote.offered_rate < quote.mid_rate);
    }

    #[test]
    fn test_volume_tiers() {
        assert_eq!(volume_multiplier(dec!(5000000)), dec!(0.50));
        assert_eq!(volume_multiplier(dec!(4999999.99)), dec!(0.65));
        assert_eq!(volume_multiplier(dec!(1000000)), dec!(0.80));
        assert_eq!(volume_multiplier(dec!(500000)), dec!(0.90));
        assert_eq!(volume_multiplier(dec!(499999)), dec!(1));
    }

    #[test]
    fn test_engagement_discounts() {
        let mut p = retail_profile();
        assert_eq!(engagement_multiplier(&p), dec!(1.00));
        p.accounts.push(account("fx-1", AccountType::Fx, dec!(100)));
        assert_eq!(engagement_multiplier(&p), dec!(0.85));
        let single_fx = profile(vec![account("fx-1", AccountType::Fx, dec!(100))]);
        assert_eq!(engagement_multiplier(&single_fx), dec!(0.90));
    }

    #[test]
    fn test_corridor_bounds() {
        let buy = compute_dynamic_rate(
            &usd(),
            Direction::Buy,
            Segment::Retail,
            dec!(129450),
            &retail_profile(),
        );
        let corridor = rate_corridor(&buy);
        assert_eq!(corridor.max_rate, buy.offered_rate);
        assert!(corridor.min_rate < buy.offered_rate);
        assert!(corridor.min_rate > buy.mid_rate);

        let sell = compute_dynamic_rate(
            &usd(),
            Direction::Sell,
            Segment::Retail,
            dec!(129450),
            &retail_profile(),
        );
        let corridor = rate_corridor(&sell);
        assert_eq!(corridor.min_rate, sell.offered_rate);
        assert!(corridor.max_rate > sell.offered_rate);
        assert!(corridor.max_rate < sell.mid_rate);
    }

    #[test]
    fn test_corridor_never_passes_half_spread() {
        let mut engaged = retail_profile();
        engaged.accounts.push(account("fx-1", AccountType::Fx, dec!(100)));
        for profile in [retail_profile(), engaged] {
            for segment in Segment::ALL {
                for amount in [dec!(1000), dec!(600000), dec!(2000000), dec!(9000000)] {
                    for direction in [Direction::Buy, Direction::Sell] {
                        let quote = compute_dynamic_rate(&usd(), direction, segment, amount, &profile);
                        let half = quote.spread_fraction() / dec!(2);
                        let corridor = rate_corridor(&quote);
                        match direction {
                            Direction::Buy => assert!(
                                corridor.min_rate >= quote.offered_rate * (Decimal::ONE - half)
                            ),
                            Direction::Sell => assert!(
                                corridor.max_rate <= quote.offered_rate * (Decimal::ONE + half)
                            ),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_kes_equivalent_overflow() {
        assert_eq!(usd().kes_equivalent(dec!(1000)), Some(dec!(129450.00)));
        let huge = Decimal::from_str_exact("1000000000000000000000000000").unwrap();
        assert_eq!(usd().kes_equivalent(huge), None);
    }

    #[test]
    fn test_corridor_rejects_outside_rate() {
        let quote = compute_dynamic_rate(
            &usd(),
            Direction::Buy,
            Segment::Retail,
            dec!(129450),
            &retail_profile(),
        );
        let corridor = rate_corridor(&quote);
        assert!(corridor.check(dec!(131.00)).is_ok());
        assert!(matches!(
            corridor.check(dec!(129.45)),
            Err(TellerError::RateOutsideCorridor { .. })
        ));
        assert!(corridor.check(dec!(131.40)).is_err());
    }

    #[test]
    fn test_zero_amount_is_not_offerable() {
        let quote = compute_dynamic_rate(
            &usd(),
            Direction::Buy,
            Segment::Retail,
            Decimal::ZERO,
            &retail_profile(),
        );
        assert!(!quote.is_offerable());
    }

    #[test]
    fn test_unknown_pair() {
        assert!(matches!(
            RateBook::standard().get("JPY/KES"),
            Err(TellerError::UnknownCurrencyPair(_))
        ));
        assert!(RateBook::standard().get("usd/kes").is_ok());
    }
}
