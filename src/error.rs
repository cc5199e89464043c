//! Error types for the checkout core.
//!
//! Every failure a checkout flow can end in is a [`CheckoutError`] variant. Raw
//! processor errors never travel past the adapter that received them: they are
//! classified into an [`ErrorKind`] and wrapped in a [`ProcessorFailure`] first.

use thiserror::Error;

/// Message shown for processor errors that are not the customer's to fix.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Message shown when a reconciled payment did not succeed.
pub const PAYMENT_FAILED_MESSAGE: &str = "Payment failed. Please try again.";

/// Checkout error taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Local input failed validation; no processor call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// The action needs a signed-in user
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    /// Card-level decline or field error reported by the processor
    #[error("Card error: {0}")]
    ProcessorCard(String),

    /// Any other processor error
    #[error("Unexpected processor error: {0}")]
    ProcessorUnexpected(String),

    /// The backend could not create an intent
    #[error("Intent creation failed: {0}")]
    IntentCreationFailed(String),

    /// Status polling hit its attempt cap without a terminal status
    #[error("Payment still processing after {attempts} status checks")]
    PollingExhausted {
        /// Number of status requests issued
        attempts: u32,
    },

    /// No payment record matches the external subscription id
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Landing page reached without a payment reference
    #[error("Missing payment reference: {0}")]
    MissingReference(String),

    /// Reconciliation observed a hard failure
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// A confirmation for this intent is already outstanding
    #[error("Confirmation already in progress for {0}")]
    ConfirmationInFlight(String),

    /// The flow already reached a terminal phase that does not allow resubmission
    #[error("Confirmation closed for {0}")]
    ConfirmationClosed(String),

    /// Backend request failed outside intent creation
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CheckoutError {
    /// Errors the customer can fix in place and resubmit.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::ProcessorCard(_))
    }

    /// True for the "still processing" outcome, which needs different wording than a failure.
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, Self::PollingExhausted { .. })
    }

    /// Text suitable for the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::ProcessorCard(msg)
            | Self::IntentCreationFailed(msg)
            | Self::AuthenticationRequired(msg)
            | Self::MissingReference(msg)
            | Self::PaymentFailed(msg)
            | Self::Backend(msg) => msg.clone(),
            Self::ProcessorUnexpected(_) => UNEXPECTED_ERROR_MESSAGE.to_string(),
            Self::PollingExhausted { .. } => {
                "Payment is still processing. Please check your email or try again later."
                    .to_string()
            }
            Self::SubscriptionNotFound(_) => {
                "No payment record found for this subscription".to_string()
            }
            Self::ConfirmationInFlight(_) => "Your payment is already being processed.".to_string(),
            Self::ConfirmationClosed(_) => "This payment has already been submitted.".to_string(),
            Self::Config(msg) => msg.clone(),
        }
    }
}

impl From<ProcessorFailure> for CheckoutError {
    fn from(failure: ProcessorFailure) -> Self {
        match failure.kind {
            ErrorKind::Card => Self::ProcessorCard(failure.message),
            ErrorKind::Validation => Self::Validation(failure.message),
            ErrorKind::Unexpected => Self::ProcessorUnexpected(failure.message),
        }
    }
}

/// Result type for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Closed classification of processor errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `card_error`
    Card,
    /// `validation_error`
    Validation,
    /// Anything else, including a missing type
    Unexpected,
}

impl ErrorKind {
    /// Classify a raw processor `type` discriminator.
    pub fn classify(error_type: Option<&str>) -> Self {
        match error_type {
            Some("card_error") => Self::Card,
            Some("validation_error") => Self::Validation,
            _ => Self::Unexpected,
        }
    }
}

/// A processor error after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub code: Option<String>,
}

impl ProcessorFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    /// Build from the raw `type`/`message`/`code` triple a processor reports.
    pub fn from_raw(error_type: Option<&str>, message: Option<String>, code: Option<String>) -> Self {
        let kind = ErrorKind::classify(error_type);
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "An error occurred".to_string());
        Self { kind, message, code }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

/// Failure of the HTTP transport itself, before a response was read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

impl From<gloo_net::Error> for TransportError {
    fn from(err: gloo_net::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}
