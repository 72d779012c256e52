//! The service catalogue.
//!
//! Each teller service has a declarative field schema and a strongly typed
//! payload. Payloads are read from the workflow's data bag one field at a
//! time, so that every problem is reported against the field that caused it.

use super::channels::{DestinationType, recommend_channels};
use super::charges::ChargeBreakdown;
use super::customer::{AccountType, CustomerProfile};
use super::money::Amount;
use super::rates::Direction;
use crate::config::PolicyConfig;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fields captured so far, keyed by schema key.
pub type DataBag = BTreeMap<String, Value>;
/// Field key to human-readable problem.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceId {
    FundsTransfer,
    BillPayment,
    DenominationExchange,
    CardServices,
    KycUpdate,
    AccountModification,
    StandingOrder,
    ServiceRequest,
}

impl ServiceId {
    pub const ALL: [ServiceId; 8] = [
        ServiceId::FundsTransfer,
        ServiceId::BillPayment,
        ServiceId::DenominationExchange,
        ServiceId::CardServices,
        ServiceId::KycUpdate,
        ServiceId::AccountModification,
        ServiceId::StandingOrder,
        ServiceId::ServiceRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::FundsTransfer => "funds-transfer",
            ServiceId::BillPayment => "bill-payment",
            ServiceId::DenominationExchange => "denomination-exchange",
            ServiceId::CardServices => "card-services",
            ServiceId::KycUpdate => "kyc-update",
            ServiceId::AccountModification => "account-modification",
            ServiceId::StandingOrder => "standing-order",
            ServiceId::ServiceRequest => "service-request",
        }
    }

    /// The counter FX service is the only one with a rate adjustment step.
    pub fn is_fx(&self) -> bool {
        *self == ServiceId::DenominationExchange
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            ServiceId::FundsTransfer => FundsTransfer::SCHEMA,
            ServiceId::BillPayment => BillPayment::SCHEMA,
            ServiceId::DenominationExchange => DenominationExchange::SCHEMA,
            ServiceId::CardServices => CardServices::SCHEMA,
            ServiceId::KycUpdate => KycUpdate::SCHEMA,
            ServiceId::AccountModification => AccountModification::SCHEMA,
            ServiceId::StandingOrder => StandingOrder::SCHEMA,
            ServiceId::ServiceRequest => GeneralRequest::SCHEMA,
        }
    }

    /// Ordered `{label, value}` projection of a data bag, for display only.
    ///
    /// Schema fields come first in schema order; any extra keys follow in
    /// key order, labelled by their key.
    pub fn to_summary(&self, bag: &DataBag) -> Vec<SummaryLine> {
        let schema = self.schema();
        let known = schema.iter().filter_map(|spec| {
            bag.get(spec.key)
                .and_then(display_value)
                .map(|value| SummaryLine::new(spec.label, value))
        });
        let extra = bag
            .iter()
            .filter(|(key, _)| !schema.iter().any(|spec| spec.key == key.as_str()))
            .filter_map(|(key, value)| display_value(value).map(|v| SummaryLine::new(key, v)));
        known.chain(extra).collect()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceId::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| format!("unknown service '{s}'"))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
}

const fn field(key: &'static str, label: &'static str, required: bool) -> FieldSpec {
    FieldSpec {
        key,
        label,
        required,
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct SummaryLine {
    pub label: String,
    pub value: String,
}

impl SummaryLine {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(format!("{} item(s)", items.len())),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        other => Some(other.to_string()),
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Reports every required schema field absent from the bag.
pub fn missing_required(schema: &[FieldSpec], bag: &DataBag) -> FieldErrors {
    schema
        .iter()
        .filter(|spec| spec.required && !is_present(bag.get(spec.key)))
        .map(|spec| (spec.key.to_string(), format!("{} is required", spec.label)))
        .collect()
}

/// Typed, field-by-field reader over a data bag.
///
/// Absent fields read as `None` without an error; the schema check reports
/// those. Present but malformed fields record an error.
pub struct FieldReader<'a> {
    bag: &'a DataBag,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(bag: &'a DataBag) -> Self {
        Self {
            bag,
            errors: FieldErrors::new(),
        }
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }

    pub fn reject(&mut self, key: &str, message: impl Into<String>) {
        self.errors.entry(key.to_string()).or_insert(message.into());
    }

    fn raw(&self, key: &str) -> Option<&'a Value> {
        let value = self.bag.get(key);
        if is_present(value) { value } else { None }
    }

    pub fn text(&mut self, key: &str) -> Option<String> {
        match self.raw(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.reject(key, "Expected text");
                None
            }
        }
    }

    pub fn parse<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text = self.text(key)?;
        match text.parse::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.reject(key, e.to_string());
                None
            }
        }
    }

    pub fn amount(&mut self, key: &str) -> Option<Amount> {
        let value = self.parse::<Decimal>(key)?;
        match Amount::new(value) {
            Ok(amount) => Some(amount),
            Err(_) => {
                self.reject(key, "Amount must be greater than zero");
                None
            }
        }
    }

    pub fn date(&mut self, key: &str) -> Option<NaiveDate> {
        let text = self.text(key)?;
        match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.reject(key, "Expected a date as YYYY-MM-DD");
                None
            }
        }
    }

    pub fn list<T: serde::de::DeserializeOwned>(&mut self, key: &str) -> Vec<T> {
        let Some(value) = self.raw(key) else {
            return Vec::new();
        };
        match serde_json::from_value::<Vec<T>>(value.clone()) {
            Ok(items) => items,
            Err(e) => {
                self.reject(key, format!("Malformed list: {e}"));
                Vec::new()
            }
        }
    }
}

/// Facts the eligibility checks need beyond the payload itself.
pub struct EligibilityContext<'a> {
    pub profile: &'a CustomerProfile,
    pub policy: &'a PolicyConfig,
    pub charges: &'a ChargeBreakdown,
}

impl EligibilityContext<'_> {
    /// Checks that `account` can be debited by `debit` plus charges.
    fn check_debit(&self, errors: &mut FieldErrors, key: &str, account: &str, debit: Decimal) {
        let Some(account) = self.profile.account(account) else {
            errors.insert(key.to_string(), format!("Account {account} does not belong to the customer"));
            return;
        };
        if !account.is_active() {
            errors.insert(
                key.to_string(),
                format!("Account {} is {:?} and cannot be debited", account.number, account.status),
            );
            return;
        }
        let Some(shortfall) = debit
            .checked_add(self.charges.total_charges)
            .and_then(|required| required.checked_sub(account.balance.value()))
        else {
            errors.insert("amount".to_string(), "Amount is too large".to_string());
            return;
        };
        let permitted = account
            .overdraft_limit
            .value()
            .min(self.policy.max_overdraft_shortfall);
        if shortfall > permitted {
            errors.insert(
                "amount".to_string(),
                format!("Insufficient funds: shortfall of KES {shortfall} exceeds the permitted overdraft of KES {permitted}"),
            );
        }
    }

    fn check_owned(&self, errors: &mut FieldErrors, key: &str, account: &str) {
        if self.profile.account(account).is_none() {
            errors.insert(key.to_string(), format!("Account {account} does not belong to the customer"));
        }
    }
}

/// The per-service interface: read a typed payload, then check eligibility.
pub trait ServiceForm: Sized {
    const SCHEMA: &'static [FieldSpec];

    /// Reads the payload; `None` when any field is absent or malformed.
    fn read(fields: &mut FieldReader<'_>) -> Option<Self>;

    /// Business eligibility checks, reported per field.
    fn validate(&self, _ctx: &EligibilityContext<'_>) -> FieldErrors {
        FieldErrors::new()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct FundsTransfer {
    pub source_account: String,
    pub destination_type: DestinationType,
    pub destination_account: String,
    pub beneficiary_name: String,
    pub amount: Amount,
    pub channel: Option<String>,
    pub narration: Option<String>,
}

impl ServiceForm for FundsTransfer {
    const SCHEMA: &'static [FieldSpec] = &[
        field("source_account", "Source account", true),
        field("destination_type", "Destination type", true),
        field("destination_account", "Destination account", true),
        field("beneficiary_name", "Beneficiary name", true),
        field("amount", "Amount", true),
        field("channel", "Payment channel", false),
        field("narration", "Narration", false),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let source_account = fields.text("source_account");
        let destination_type = fields.parse::<DestinationType>("destination_type");
        let destination_account = fields.text("destination_account");
        let beneficiary_name = fields.text("beneficiary_name");
        let amount = fields.amount("amount");
        let channel = fields.text("channel");
        let narration = fields.text("narration");

        if let (Some(source), Some(DestinationType::SameBank), Some(destination)) =
            (&source_account, destination_type, &destination_account)
            && source == destination
        {
            fields.reject("destination_account", "Cannot transfer to the source account");
            return None;
        }

        Some(Self {
            source_account: source_account?,
            destination_type: destination_type?,
            destination_account: destination_account?,
            beneficiary_name: beneficiary_name?,
            amount: amount?,
            channel,
            narration,
        })
    }

    fn validate(&self, ctx: &EligibilityContext<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        ctx.check_debit(&mut errors, "source_account", &self.source_account, self.amount.value());

        let options = recommend_channels(self.amount.value(), self.destination_type);
        if !options.iter().any(|o| o.is_eligible()) {
            errors.insert(
                "amount".to_string(),
                format!(
                    "No payment channel can carry KES {} to a {} destination",
                    self.amount, self.destination_type
                ),
            );
        } else if let Some(selected) = &self.channel {
            match options.iter().find(|o| &o.id == selected) {
                None => {
                    errors.insert("channel".to_string(), format!("Unknown channel '{selected}'"));
                }
                Some(option) if !option.is_eligible() => {
                    let reason = option.eligibility.reason.clone().unwrap_or_default();
                    errors.insert("channel".to_string(), reason);
                }
                Some(_) => {}
            }
        }
        errors
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BillPayment {
    pub biller_code: String,
    pub bill_reference: String,
    pub source_account: String,
    pub amount: Amount,
}

impl ServiceForm for BillPayment {
    const SCHEMA: &'static [FieldSpec] = &[
        field("biller_code", "Biller", true),
        field("bill_reference", "Bill reference", true),
        field("source_account", "Source account", true),
        field("amount", "Amount", true),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let biller_code = fields.text("biller_code");
        let bill_reference = fields.text("bill_reference");
        let source_account = fields.text("source_account");
        let amount = fields.amount("amount");
        Some(Self {
            biller_code: biller_code?,
            bill_reference: bill_reference?,
            source_account: source_account?,
            amount: amount?,
        })
    }

    fn validate(&self, ctx: &EligibilityContext<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        ctx.check_debit(&mut errors, "source_account", &self.source_account, self.amount.value());
        errors
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DenominationExchange {
    pub currency_pair: String,
    pub direction: Direction,
    pub foreign_amount: Amount,
    pub settlement_account: Option<String>,
}

impl ServiceForm for DenominationExchange {
    const SCHEMA: &'static [FieldSpec] = &[
        field("currency_pair", "Currency pair", true),
        field("direction", "Direction", true),
        field("foreign_amount", "Foreign amount", true),
        field("settlement_account", "Settlement account", false),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let currency_pair = fields.text("currency_pair").map(|p| p.to_ascii_uppercase());
        let direction = fields.parse::<Direction>("direction");
        let foreign_amount = fields.amount("foreign_amount");
        let settlement_account = fields.text("settlement_account");
        Some(Self {
            currency_pair: currency_pair?,
            direction: direction?,
            foreign_amount: foreign_amount?,
            settlement_account,
        })
    }

    fn validate(&self, ctx: &EligibilityContext<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match ctx.policy.rates.get(&self.currency_pair) {
            Err(e) => {
                errors.insert("currency_pair".to_string(), e.to_string());
            }
            Ok(pair) if pair.kes_equivalent(self.foreign_amount.value()).is_none() => {
                errors.insert(
                    "foreign_amount".to_string(),
                    "Amount is too large to convert".to_string(),
                );
            }
            Ok(_) => {}
        }
        if let Some(account) = &self.settlement_account {
            match ctx.profile.account(account) {
                None => {
                    errors.insert(
                        "settlement_account".to_string(),
                        format!("Account {account} does not belong to the customer"),
                    );
                }
                Some(a) if !a.is_active() => {
                    errors.insert(
                        "settlement_account".to_string(),
                        format!("Account {account} is not active"),
                    );
                }
                Some(_) => {}
            }
        }
        errors
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum CardAction {
    Block,
    Unblock,
    Replace,
    LimitChange,
}

impl FromStr for CardAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("unknown card action '{s}'"))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CardServices {
    pub card_last4: String,
    pub action: CardAction,
    pub new_limit: Option<Amount>,
}

impl ServiceForm for CardServices {
    const SCHEMA: &'static [FieldSpec] = &[
        field("card_last4", "Card (last 4 digits)", true),
        field("action", "Action", true),
        field("new_limit", "New POS limit", false),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let card_last4 = fields.text("card_last4");
        if let Some(digits) = &card_last4
            && (digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()))
        {
            fields.reject("card_last4", "Enter the last 4 digits of the card");
        }
        let action = fields.parse::<CardAction>("action");
        let new_limit = fields.amount("new_limit");
        if action == Some(CardAction::LimitChange) && new_limit.is_none() {
            fields.reject("new_limit", "New POS limit is required for a limit change");
            return None;
        }
        Some(Self {
            card_last4: card_last4.filter(|d| d.len() == 4)?,
            action: action?,
            new_limit,
        })
    }
}

/// A document captured for a KYC update; verified as an artefact.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct KycDocument {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub biometric_data: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct KycUpdate {
    pub id_number: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub documents: Vec<KycDocument>,
}

impl ServiceForm for KycUpdate {
    const SCHEMA: &'static [FieldSpec] = &[
        field("id_number", "ID number", true),
        field("phone", "Phone number", true),
        field("email", "Email", false),
        field("address", "Physical address", false),
        field("documents", "Documents", false),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let id_number = fields.text("id_number");
        let phone = fields.text("phone");
        let email = fields.text("email");
        if let Some(email) = &email
            && !email.contains('@')
        {
            fields.reject("email", "Enter a valid email address");
        }
        let address = fields.text("address");
        let documents = fields.list::<KycDocument>("documents");
        Some(Self {
            id_number: id_number?,
            phone: phone?,
            email: email.filter(|e| e.contains('@')),
            address,
            documents,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum Modification {
    ChangeSignatory,
    ConvertType,
    OverdraftLimit,
    Close,
}

impl FromStr for Modification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("unknown modification '{s}'"))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AccountModification {
    pub account_number: String,
    pub modification: Modification,
    pub details: Option<String>,
    pub new_overdraft_limit: Option<Amount>,
}

impl ServiceForm for AccountModification {
    const SCHEMA: &'static [FieldSpec] = &[
        field("account_number", "Account", true),
        field("modification", "Modification", true),
        field("details", "Details", false),
        field("new_overdraft_limit", "New overdraft limit", false),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let account_number = fields.text("account_number");
        let modification = fields.parse::<Modification>("modification");
        let details = fields.text("details");
        let new_overdraft_limit = fields.amount("new_overdraft_limit");
        if modification == Some(Modification::OverdraftLimit) && new_overdraft_limit.is_none() {
            fields.reject(
                "new_overdraft_limit",
                "New overdraft limit is required for an overdraft change",
            );
            return None;
        }
        Some(Self {
            account_number: account_number?,
            modification: modification?,
            details,
            new_overdraft_limit,
        })
    }

    fn validate(&self, ctx: &EligibilityContext<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let Some(account) = ctx.profile.account(&self.account_number) else {
            ctx.check_owned(&mut errors, "account_number", &self.account_number);
            return errors;
        };
        match self.modification {
            Modification::Close if !account.balance.value().is_zero() => {
                errors.insert(
                    "modification".to_string(),
                    "Account balance must be zero before closure".to_string(),
                );
            }
            Modification::OverdraftLimit if account.account_type != AccountType::Current => {
                errors.insert(
                    "modification".to_string(),
                    "Overdrafts are only available on current accounts".to_string(),
                );
            }
            _ => {}
        }
        errors
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("unknown frequency '{s}'"))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct StandingOrder {
    pub source_account: String,
    pub beneficiary_account: String,
    pub amount: Amount,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl ServiceForm for StandingOrder {
    const SCHEMA: &'static [FieldSpec] = &[
        field("source_account", "Source account", true),
        field("beneficiary_account", "Beneficiary account", true),
        field("amount", "Amount per payment", true),
        field("frequency", "Frequency", true),
        field("start_date", "Start date", true),
        field("end_date", "End date", false),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let source_account = fields.text("source_account");
        let beneficiary_account = fields.text("beneficiary_account");
        let amount = fields.amount("amount");
        let frequency = fields.parse::<Frequency>("frequency");
        let start_date = fields.date("start_date");
        let end_date = fields.date("end_date");
        if let (Some(start), Some(end)) = (start_date, end_date)
            && end < start
        {
            fields.reject("end_date", "End date must not precede the start date");
            return None;
        }
        Some(Self {
            source_account: source_account?,
            beneficiary_account: beneficiary_account?,
            amount: amount?,
            frequency: frequency?,
            start_date: start_date?,
            end_date,
        })
    }

    fn validate(&self, ctx: &EligibilityContext<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match ctx.profile.account(&self.source_account) {
            None => ctx.check_owned(&mut errors, "source_account", &self.source_account),
            Some(account) if !account.is_active() => {
                errors.insert(
                    "source_account".to_string(),
                    format!("Account {} is not active", account.number),
                );
            }
            Some(_) => {}
        }
        errors
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    ChequeBook,
    Statement,
    BankLetter,
}

impl FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("unknown request type '{s}'"))
    }
}

/// Cheque books, statements and letters.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct GeneralRequest {
    pub request_type: RequestType,
    pub account_number: String,
    pub notes: Option<String>,
}

impl ServiceForm for GeneralRequest {
    const SCHEMA: &'static [FieldSpec] = &[
        field("request_type", "Request", true),
        field("account_number", "Account", true),
        field("notes", "Notes", false),
    ];

    fn read(fields: &mut FieldReader<'_>) -> Option<Self> {
        let request_type = fields.parse::<RequestType>("request_type");
        let account_number = fields.text("account_number");
        let notes = fields.text("notes");
        Some(Self {
            request_type: request_type?,
            account_number: account_number?,
            notes,
        })
    }

    fn validate(&self, ctx: &EligibilityContext<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        ctx.check_owned(&mut errors, "account_number", &self.account_number);
        errors
    }
}

/// A validated request for one service.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "service", rename_all = "kebab-case")]
pub enum ServicePayload {
    FundsTransfer(FundsTransfer),
    BillPayment(BillPayment),
    DenominationExchange(DenominationExchange),
    CardServices(CardServices),
    KycUpdate(KycUpdate),
    AccountModification(AccountModification),
    StandingOrder(StandingOrder),
    ServiceRequest(GeneralRequest),
}

fn read_form<F: ServiceForm>(bag: &DataBag) -> Result<F, FieldErrors> {
    let mut errors = missing_required(F::SCHEMA, bag);
    let mut reader = FieldReader::new(bag);
    let form = F::read(&mut reader);
    for (key, message) in reader.into_errors() {
        errors.entry(key).or_insert(message);
    }
    match form {
        Some(form) if errors.is_empty() => Ok(form),
        _ => Err(errors),
    }
}

impl ServicePayload {
    /// Reads and field-validates the payload for `service` from a data bag.
    pub fn from_bag(service: ServiceId, bag: &DataBag) -> Result<Self, FieldErrors> {
        Ok(match service {
            ServiceId::FundsTransfer => Self::FundsTransfer(read_form(bag)?),
            ServiceId::BillPayment => Self::BillPayment(read_form(bag)?),
            ServiceId::DenominationExchange => Self::DenominationExchange(read_form(bag)?),
            ServiceId::CardServices => Self::CardServices(read_form(bag)?),
            ServiceId::KycUpdate => Self::KycUpdate(read_form(bag)?),
            ServiceId::AccountModification => Self::AccountModification(read_form(bag)?),
            ServiceId::StandingOrder => Self::StandingOrder(read_form(bag)?),
            ServiceId::ServiceRequest => Self::ServiceRequest(read_form(bag)?),
        })
    }

    pub fn service(&self) -> ServiceId {
        match self {
            Self::FundsTransfer(_) => ServiceId::FundsTransfer,
            Self::BillPayment(_) => ServiceId::BillPayment,
            Self::DenominationExchange(_) => ServiceId::DenominationExchange,
            Self::CardServices(_) => ServiceId::CardServices,
            Self::KycUpdate(_) => ServiceId::KycUpdate,
            Self::AccountModification(_) => ServiceId::AccountModification,
            Self::StandingOrder(_) => ServiceId::StandingOrder,
            Self::ServiceRequest(_) => ServiceId::ServiceRequest,
        }
    }

    pub fn validate(&self, ctx: &EligibilityContext<'_>) -> FieldErrors {
        match self {
            Self::FundsTransfer(form) => form.validate(ctx),
            Self::BillPayment(form) => form.validate(ctx),
            Self::DenominationExchange(form) => form.validate(ctx),
            Self::CardServices(form) => form.validate(ctx),
            Self::KycUpdate(form) => form.validate(ctx),
            Self::AccountModification(form) => form.validate(ctx),
            Self::StandingOrder(form) => form.validate(ctx),
            Self::ServiceRequest(form) => form.validate(ctx),
        }
    }

    /// The KES amount moved by the transaction, if any.
    pub fn kes_amount(&self, policy: &PolicyConfig) -> Option<Decimal> {
        match self {
            Self::FundsTransfer(form) => Some(form.amount.value()),
            Self::BillPayment(form) => Some(form.amount.value()),
            Self::StandingOrder(form) => Some(form.amount.value()),
            Self::DenominationExchange(form) => policy
                .rates
                .get(&form.currency_pair)
                .ok()
                .and_then(|pair| pair.kes_equivalent(form.foreign_amount.value())),
            _ => None,
        }
    }
}
