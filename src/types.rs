//! Data model shared by the checkout flows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, CheckoutResult};

/// Processor-side intent identifier, e.g. `pi_3Nxx` or `seti_1Oxx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-use client secret. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The intent id embedded in a `<id>_secret_<nonce>` secret.
    pub fn intent_id(&self) -> Option<IntentId> {
        match self.0.split_once("_secret_") {
            Some((id, nonce)) if !id.is_empty() && !nonce.is_empty() => Some(IntentId::new(id)),
            _ => None,
        }
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(**redacted**)")
    }
}

/// What confirming the intent does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    /// Moves money now.
    OneTime,
    /// Stores a payment method.
    Setup,
    /// Stores a payment method for a recurring donation.
    SubscriptionSetup,
}

impl IntentKind {
    pub fn is_setup(self) -> bool {
        matches!(self, Self::Setup | Self::SubscriptionSetup)
    }
}

/// An intent created by the backend for one checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub id: IntentId,
    pub client_secret: ClientSecret,
    pub kind: IntentKind,
    /// Whole currency units.
    pub amount: u64,
    pub currency: String,
}

impl Intent {
    /// Build an intent from the secret the backend returned, deriving its id.
    pub fn from_client_secret(
        kind: IntentKind,
        client_secret: ClientSecret,
        amount: u64,
        currency: impl Into<String>,
    ) -> CheckoutResult<Self> {
        let id = client_secret.intent_id().ok_or_else(|| {
            CheckoutError::IntentCreationFailed("Malformed client secret received from server".into())
        })?;
        Ok(Self {
            id,
            client_secret,
            kind,
            amount,
            currency: currency.into(),
        })
    }
}

/// Donor details collected by a form. Passed by value, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorProfile {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl DonorProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            address: address.into(),
        }
    }

    pub fn billing_details(&self) -> BillingDetails {
        BillingDetails {
            name: self.name.clone(),
            email: self.email.clone(),
            address: BillingAddress {
                line1: self.address.clone(),
            },
        }
    }
}

/// `payment_method_data.billing_details` of a confirm call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: String,
    pub address: BillingAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingAddress {
    pub line1: String,
}

/// Raw input of a donation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DonorForm {
    pub amount: f64,
    pub email: String,
    pub name: String,
    pub address: String,
    pub consent: bool,
}

/// A validated donation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Donation {
    pub donor: DonorProfile,
    /// Rounded to whole currency units.
    pub amount: u64,
}

impl DonorForm {
    /// Check every field and collect all messages.
    pub fn validate(&self) -> CheckoutResult<Donation> {
        let mut errors = Vec::new();

        if self.email.trim().is_empty() {
            errors.push("Email is required");
        } else if !looks_like_email(&self.email) {
            errors.push("Please enter a valid email address");
        }
        if self.name.trim().is_empty() {
            errors.push("Name is required");
        }
        if self.address.trim().is_empty() {
            errors.push("Address is required");
        }
        if !self.consent {
            errors.push("You must agree to the data collection");
        }
        if !self.amount.is_finite() || self.amount < 1.0 {
            errors.push("Amount must be at least 1");
        }

        if !errors.is_empty() {
            return Err(CheckoutError::Validation(errors.join("; ")));
        }

        Ok(Donation {
            donor: DonorProfile::new(self.name.trim(), self.email.trim(), self.address.trim()),
            amount: self.amount.round() as u64,
        })
    }
}

fn looks_like_email(value: &str) -> bool {
    value.split_whitespace().any(|token| {
        let Some(at) = token.find('@') else {
            return false;
        };
        let domain = &token[at + 1..];
        at > 0
            && domain
                .rfind('.')
                .is_some_and(|dot| dot > 0 && dot + 1 < domain.len())
    })
}

/// Signed-in member renewing a membership.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub name: String,
    pub surname: String,
    pub email: String,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// Subscription identifier as it appears in a cancellation link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionRef(String);

impl SubscriptionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend payment record id. Distinct from [`SubscriptionRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct PaymentRecordId(u64);

impl PaymentRecordId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PaymentRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Intent status as reported by the processor or the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    Succeeded,
    Processing,
    Pending,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Canceled,
    Failed,
    Other(String),
}

impl IntentStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "pending" => Self::Pending,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "canceled" | "cancelled" => Self::Canceled,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Processing => "processing",
            Self::Pending => "pending",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }

    /// `succeeded`, `failed` and `canceled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl<'de> Deserialize<'de> for IntentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| Self::parse(&s))
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The customer-facing journeys this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutFlow {
    OneTimeGift,
    MonthlySupport,
    MembershipRenewal,
}

impl fmt::Display for CheckoutFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneTimeGift => "one_time_gift",
            Self::MonthlySupport => "monthly_support",
            Self::MembershipRenewal => "membership_renewal",
        })
    }
}

/// Everything the confirmation step needs, as produced by intent creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCheckout {
    pub flow: CheckoutFlow,
    pub intent: Intent,
    pub donor: DonorProfile,
}

/// Outbound notifications. Rendering them is the host's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// Synchronous confirmation succeeded; the app is handing off to `completion_url`.
    Confirmed {
        flow: CheckoutFlow,
        intent_id: IntentId,
        completion_url: String,
    },
    /// Terminal success; navigation to `destination` follows.
    Succeeded {
        flow: CheckoutFlow,
        destination: String,
    },
    /// Hard failure; `retry_route` restarts the flow.
    Failed {
        flow: CheckoutFlow,
        message: String,
        retry_route: String,
    },
    /// Soft failure: the payment may still complete out-of-band.
    StillProcessing { flow: CheckoutFlow, message: String },
    /// Cancellation accepted; the subscription runs until the period ends.
    SubscriptionCancelled { message: String },
    /// Anything else that needs a generic notification.
    Error { title: String, message: String },
}
