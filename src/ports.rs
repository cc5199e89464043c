//! Capability traits the checkout core is written against.
//!
//! The browser, Stripe.js and the backend are reached only through these
//! traits. `browser` and `client` provide the wasm implementations; tests
//! provide scripted ones.

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api::IntentRequestClient;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutResult, ProcessorFailure, TransportError};
use crate::reporter::FailureReporter;
use crate::types::{
    BillingDetails, CheckoutEvent, ClientSecret, Donation, IntentId, IntentStatus,
    PreparedCheckout,
};

/// Supplies the bearer token for authenticated backend calls.
#[async_trait(?Send)]
pub trait TokenProvider {
    /// `None` when nobody is signed in.
    async fn get_token(&self) -> Option<String>;
}

/// Parameters of `stripe.confirmPayment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPaymentRequest {
    pub client_secret: ClientSecret,
    pub return_url: String,
    pub billing_details: BillingDetails,
}

/// Parameters of `stripe.confirmSetup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmSetupRequest {
    pub client_secret: ClientSecret,
    pub return_url: String,
}

/// The part of a PaymentIntent the core looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentSnapshot {
    pub id: IntentId,
    pub client_secret: Option<ClientSecret>,
    pub status: IntentStatus,
}

/// How a confirm call ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Resolved in-page with a PaymentIntent.
    Concluded(PaymentIntentSnapshot),
    /// A SetupIntent was confirmed in-page.
    SetupConfirmed,
    /// The payment method required a full-page redirect; the browser is leaving.
    Redirected,
}

/// The processor SDK surface the core consumes.
#[async_trait(?Send)]
pub trait Processor {
    /// Validate the embedded payment element locally.
    async fn submit(&self) -> Result<(), ProcessorFailure>;

    /// Confirm a PaymentIntent, redirecting only if the payment method requires it.
    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<Confirmation, ProcessorFailure>;

    /// Confirm a SetupIntent, redirecting only if the payment method requires it.
    async fn confirm_setup(
        &self,
        request: ConfirmSetupRequest,
    ) -> Result<Confirmation, ProcessorFailure>;

    async fn retrieve_payment_intent(
        &self,
        client_secret: &ClientSecret,
    ) -> Result<PaymentIntentSnapshot, ProcessorFailure>;
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A backend request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// A backend response, body unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends backend requests.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Outbound notification port.
pub trait Notifier {
    fn emit(&self, event: CheckoutEvent);
}

/// The current page URL.
pub trait Location {
    /// Query string including the leading `?`, or empty.
    fn search(&self) -> String;

    fn pathname(&self) -> String;

    /// Replace the current history entry without navigating.
    fn replace(&self, url: &str);
}

/// In-app navigation.
pub trait Navigator {
    fn navigate(&self, to: &str);
}

/// Timers. Dropping the returned future cancels the wait.
#[async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

/// Every capability a checkout flow needs, plus its configuration.
#[derive(Clone)]
pub struct CheckoutPorts {
    pub processor: Rc<dyn Processor>,
    pub transport: Rc<dyn HttpTransport>,
    pub tokens: Rc<dyn TokenProvider>,
    pub notifier: Rc<dyn Notifier>,
    pub location: Rc<dyn Location>,
    pub navigator: Rc<dyn Navigator>,
    pub timer: Rc<dyn Timer>,
    pub config: Rc<CheckoutConfig>,
}

impl CheckoutPorts {
    /// Backend client sharing this bundle's transport, tokens and config.
    pub fn client(&self) -> IntentRequestClient {
        IntentRequestClient::new(
            Rc::clone(&self.transport),
            Rc::clone(&self.tokens),
            Rc::clone(&self.config),
        )
    }

    /// Create the one-time gift intent, announcing any failure.
    pub async fn prepare_gift(&self, donation: &Donation) -> CheckoutResult<PreparedCheckout> {
        self.client()
            .create_payment_intent(donation)
            .await
            .map_err(|err| FailureReporter::from_ports(self).report(err))
    }
}
