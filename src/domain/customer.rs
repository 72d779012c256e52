use super::money::Balance;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

const HIGH_VALUE_AGGREGATE: Decimal = dec!(5000000);
const HIGH_VALUE_FX_AGGREGATE: Decimal = dec!(2000000);
const YOUNG_PROFESSIONAL_CEILING: Decimal = dec!(500000);

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    Savings,
    Current,
    FixedDeposit,
    Fx,
    Loan,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Dormant,
    Blocked,
}

/// A customer account as seen by the teller. The workflow only reads it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub number: String,
    pub account_type: AccountType,
    pub currency: String,
    pub balance: Balance,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub overdraft_limit: Balance,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Customer tier driving discount eligibility.
///
/// Variants are declared from least to most privileged, so `Ord` follows
/// pricing privilege.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Segment {
    Retail,
    YoungProfessional,
    Sme,
    HighValue,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::Retail,
        Segment::YoungProfessional,
        Segment::Sme,
        Segment::HighValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Retail => "retail",
            Segment::YoungProfessional => "young-professional",
            Segment::Sme => "sme",
            Segment::HighValue => "high-value",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::ALL
            .into_iter()
            .find(|segment| segment.as_str() == s)
            .ok_or_else(|| format!("unknown segment '{s}'"))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct ContactInfo {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Snapshot of a customer and their accounts for the duration of a workflow.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CustomerProfile {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl CustomerProfile {
    pub fn account(&self, number: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.number == number)
    }

    pub fn has_account_type(&self, account_type: AccountType) -> bool {
        self.accounts.iter().any(|a| a.account_type == account_type)
    }

    pub fn has_fx_account(&self) -> bool {
        self.has_account_type(AccountType::Fx)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Sum of non-loan balances, nominal across currencies.
    pub fn aggregate_balance(&self) -> Balance {
        self.accounts
            .iter()
            .filter(|a| a.account_type != AccountType::Loan)
            .map(|a| a.balance)
            .sum()
    }

    /// Recomputed on every call from the account snapshot.
    pub fn segment(&self) -> Segment {
        let aggregate = self.aggregate_balance().value();

        if aggregate >= HIGH_VALUE_AGGREGATE
            || (aggregate >= HIGH_VALUE_FX_AGGREGATE && self.has_fx_account())
        {
            Segment::HighValue
        } else if self.has_account_type(AccountType::Loan) && self.account_count() >= 3 {
            Segment::Sme
        } else if self.account_count() <= 2 && aggregate < YOUNG_PROFESSIONAL_CEILING {
            Segment::YoungProfessional
        } else {
            Segment::Retail
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_high_value_by_aggregate() {
        let p = profile(vec![account("1", AccountType::Savings, dec!(5000000))]);
        assert_eq!(p.segment(), Segment::HighValue);
    }

    #[test]
    fn test_high_value_requires_fx_below_five_million() {
        let mut p = profile(vec![
            account("1", AccountType::Savings, dec!(2500000)),
            account("2", AccountType::Current, dec!(10000)),
            account("3", AccountType::Current, dec!(10000)),
        ]);
        assert_eq!(p.segment(), Segment::Retail);
        p.accounts.push(account("4", AccountType::Fx, dec!(1000)));
        assert_eq!(p.segment(), Segment::HighValue);
    }

    #[test]
    fn test_sme_with_loan() {
        let p = profile(vec![
            account("1", AccountType::Current, dec!(300000)),
            account("2", AccountType::Savings, dec!(100000)),
            account("3", AccountType::Loan, dec!(-2000000)),
        ]);
        assert_eq!(p.segment(), Segment::Sme);
    }

    #[test]
    fn test_loan_balance_excluded_from_aggregate() {
        let p = profile(vec![
            account("1", AccountType::Current, dec!(300000)),
            account("2", AccountType::Loan, dec!(-200000)),
        ]);
        assert_eq!(p.aggregate_balance(), Balance::new(dec!(300000)));
    }

    #[test]
    fn test_young_professional_and_retail() {
        let p = profile(vec![account("1", AccountType::Savings, dec!(120000))]);
        assert_eq!(p.segment(), Segment::YoungProfessional);
        assert_eq!(retail_profile().segment(), Segment::Retail);
    }

    #[test]
    fn test_segment_ordering_follows_privilege() {
        assert!(Segment::HighValue > Segment::Sme);
        assert!(Segment::Sme > Segment::YoungProfessional);
        assert!(Segment::YoungProfessional > Segment::Retail);
    }

    #[test]
    fn test_segment_parse() {
        assert_eq!("high-value".parse::<Segment>(), Ok(Segment::HighValue));
        assert!("gold".parse::<Segment>().is_err());
    }
}
