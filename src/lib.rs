//! Stripe.js payment confirmation and reconciliation for Yew apps.
//!
//! The checkout core (`api`, `confirmation`, `redirect`, `poller`,
//! `subscription`, `landing`, `reporter`) is written against the traits in [`ports`] and
//! runs on any single-threaded executor. `bindings`, `client`, `browser` and
//! the components plug it into the browser.

pub mod api;
pub mod bindings;
pub mod browser;
pub mod checkout_component;
pub mod client;
pub mod components;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod interop;
pub mod landing;
pub mod landing_component;
pub mod lifecycle;
pub mod poller;
pub mod ports;
pub mod redirect;
pub mod reporter;
pub mod subscription;
pub mod types;

pub use api::IntentRequestClient;
pub use bindings::{JsElements, JsPaymentElement, JsStripe};
pub use checkout_component::{StripeCheckout, StripeCheckoutProps};
pub use client::{mount_payment_element, ElementsOptions, PaymentElementOptions, StripeJsProcessor};
pub use config::{CheckoutConfig, FlowRoutes};
pub use confirmation::{ConfirmationController, ConfirmationState, Outcome, Phase};
pub use error::{CheckoutError, CheckoutResult, ErrorKind, ProcessorFailure, TransportError};
pub use interop::use_stripejs;
pub use landing::{LandingOutcome, ReconcileStrategy, ReturnLanding};
pub use landing_component::{PaymentLanding, PaymentLandingProps};
pub use lifecycle::TaskGuard;
pub use poller::{PollState, StatusPoller, TerminalStatus};
pub use ports::CheckoutPorts;
pub use redirect::{Reconciliation, RedirectReconciler, ReturnParams};
pub use reporter::FailureReporter;
pub use subscription::{Cancellation, SubscriptionManager};
pub use types::{
    CheckoutEvent, CheckoutFlow, ClientSecret, Donation, DonorForm, DonorProfile, Intent,
    IntentId, IntentKind, IntentStatus, Member, PaymentRecordId, PreparedCheckout,
    SubscriptionRef,
};
