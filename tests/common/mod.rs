//! Scripted ports shared by the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use yew_stripe_flow::error::{ErrorKind, ProcessorFailure, TransportError};
use yew_stripe_flow::ports::{
    ApiRequest, ApiResponse, CheckoutPorts, ConfirmPaymentRequest, ConfirmSetupRequest,
    Confirmation, HttpTransport, Location, Navigator, Notifier, PaymentIntentSnapshot, Processor,
    Timer, TokenProvider,
};
use yew_stripe_flow::{
    CheckoutConfig, CheckoutEvent, CheckoutFlow, ClientSecret, DonorProfile, Intent, IntentId,
    IntentKind, IntentStatus, PreparedCheckout,
};

/// Pending once, then ready.
pub struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

pub fn yield_now() -> YieldNow {
    YieldNow(false)
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedProcessor {
    pub submit_results: RefCell<VecDeque<Result<(), ProcessorFailure>>>,
    pub confirm_results: RefCell<VecDeque<Result<Confirmation, ProcessorFailure>>>,
    pub retrieve_results: RefCell<VecDeque<Result<PaymentIntentSnapshot, ProcessorFailure>>>,
    pub submit_calls: Cell<u32>,
    pub payment_requests: RefCell<Vec<ConfirmPaymentRequest>>,
    pub setup_requests: RefCell<Vec<ConfirmSetupRequest>>,
    pub retrieve_calls: Cell<u32>,
    /// Suspend once inside every confirm call.
    pub yield_on_confirm: Cell<bool>,
}

impl ScriptedProcessor {
    pub fn push_confirm(&self, result: Result<Confirmation, ProcessorFailure>) {
        self.confirm_results.borrow_mut().push_back(result);
    }

    pub fn push_retrieve(&self, result: Result<PaymentIntentSnapshot, ProcessorFailure>) {
        self.retrieve_results.borrow_mut().push_back(result);
    }

    pub fn push_submit(&self, result: Result<(), ProcessorFailure>) {
        self.submit_results.borrow_mut().push_back(result);
    }

    pub fn confirm_calls(&self) -> usize {
        self.payment_requests.borrow().len() + self.setup_requests.borrow().len()
    }

    fn next_confirm(&self) -> Result<Confirmation, ProcessorFailure> {
        self.confirm_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ProcessorFailure::unexpected("no confirm result scripted")))
    }
}

#[async_trait(?Send)]
impl Processor for ScriptedProcessor {
    async fn submit(&self) -> Result<(), ProcessorFailure> {
        self.submit_calls.set(self.submit_calls.get() + 1);
        self.submit_results.borrow_mut().pop_front().unwrap_or(Ok(()))
    }

    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<Confirmation, ProcessorFailure> {
        self.payment_requests.borrow_mut().push(request);
        if self.yield_on_confirm.get() {
            yield_now().await;
        }
        self.next_confirm()
    }

    async fn confirm_setup(
        &self,
        request: ConfirmSetupRequest,
    ) -> Result<Confirmation, ProcessorFailure> {
        self.setup_requests.borrow_mut().push(request);
        if self.yield_on_confirm.get() {
            yield_now().await;
        }
        self.next_confirm()
    }

    async fn retrieve_payment_intent(
        &self,
        _client_secret: &ClientSecret,
    ) -> Result<PaymentIntentSnapshot, ProcessorFailure> {
        self.retrieve_calls.set(self.retrieve_calls.get() + 1);
        self.retrieve_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ProcessorFailure::unexpected("no retrieve result scripted")))
    }
}

pub fn snapshot(id: &str, status: &str) -> PaymentIntentSnapshot {
    PaymentIntentSnapshot {
        id: IntentId::new(id),
        client_secret: Some(ClientSecret::new(format!("{}_secret_abc", id))),
        status: IntentStatus::parse(status),
    }
}

pub fn card_declined() -> ProcessorFailure {
    ProcessorFailure::from_raw(
        Some("card_error"),
        Some("Your card was declined.".into()),
        Some("card_declined".into()),
    )
}

pub fn incomplete_number() -> ProcessorFailure {
    ProcessorFailure::new(ErrorKind::Validation, "Your card number is incomplete.")
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedTransport {
    pub responses: RefCell<VecDeque<Result<ApiResponse, TransportError>>>,
    pub seen: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn push(&self, status: u16, body: &str) {
        self.responses
            .borrow_mut()
            .push_back(Ok(ApiResponse::new(status, body)));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .borrow_mut()
            .push_back(Err(TransportError::Network(message.to_string())));
    }

    pub fn requests(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.seen.borrow().iter().filter(|r| r.url.contains(path)).count()
    }
}

#[async_trait(?Send)]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no response scripted".into())))
    }
}

// ---------------------------------------------------------------------------
// Browser-side fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: RefCell<Vec<CheckoutEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<CheckoutEvent> {
        self.events.borrow().clone()
    }

    pub fn last(&self) -> Option<CheckoutEvent> {
        self.events.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn emit(&self, event: CheckoutEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub visits: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, to: &str) {
        self.visits.borrow_mut().push(to.to_string());
    }
}

/// In-memory URL. `sticky` ignores `replace`, like a reload of the original URL.
#[derive(Default)]
pub struct MemoryLocation {
    pub pathname: RefCell<String>,
    pub search: RefCell<String>,
    pub replaced: RefCell<Vec<String>>,
    pub sticky: Cell<bool>,
}

impl MemoryLocation {
    /// Point at `url`, e.g. `/payment-result?payment_intent=pi_1`.
    pub fn set(&self, url: &str) {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, format!("?{}", query)),
            None => (url, String::new()),
        };
        *self.pathname.borrow_mut() = path.to_string();
        *self.search.borrow_mut() = query;
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.borrow().clone()
    }
}

impl Location for MemoryLocation {
    fn search(&self) -> String {
        self.search.borrow().clone()
    }

    fn pathname(&self) -> String {
        self.pathname.borrow().clone()
    }

    fn replace(&self, url: &str) {
        self.replaced.borrow_mut().push(url.to_string());
        if !self.sticky.get() {
            self.set(url);
        }
    }
}

/// Records requested sleeps and returns at once, or never when `hang` is set.
#[derive(Default)]
pub struct VirtualTimer {
    pub sleeps: RefCell<Vec<Duration>>,
    pub hang: Cell<bool>,
}

impl VirtualTimer {
    pub fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }

    pub fn count(&self) -> usize {
        self.sleeps.borrow().len()
    }
}

#[async_trait(?Send)]
impl Timer for VirtualTimer {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        if self.hang.get() {
            futures::future::pending::<()>().await;
        }
    }
}

pub struct StaticToken(pub Option<String>);

#[async_trait(?Send)]
impl TokenProvider for StaticToken {
    async fn get_token(&self) -> Option<String> {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub processor: Rc<ScriptedProcessor>,
    pub transport: Rc<ScriptedTransport>,
    pub notifier: Rc<RecordingNotifier>,
    pub navigator: Rc<RecordingNavigator>,
    pub location: Rc<MemoryLocation>,
    pub timer: Rc<VirtualTimer>,
    pub token: Option<String>,
    pub config: Rc<CheckoutConfig>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            processor: Rc::default(),
            transport: Rc::default(),
            notifier: Rc::default(),
            navigator: Rc::default(),
            location: Rc::default(),
            timer: Rc::default(),
            token: None,
            config: Rc::new(CheckoutConfig::default()),
        }
    }

    pub fn signed_in() -> Self {
        Self {
            token: Some("tok".to_string()),
            ..Self::new()
        }
    }

    pub fn at(self, url: &str) -> Self {
        self.location.set(url);
        self
    }

    pub fn ports(&self) -> CheckoutPorts {
        CheckoutPorts {
            processor: self.processor.clone(),
            transport: self.transport.clone(),
            tokens: Rc::new(StaticToken(self.token.clone())),
            notifier: self.notifier.clone(),
            location: self.location.clone(),
            navigator: self.navigator.clone(),
            timer: self.timer.clone(),
            config: Rc::clone(&self.config),
        }
    }
}

pub fn donor() -> DonorProfile {
    DonorProfile::new("Ada Lovelace", "ada@example.org", "Rue du Lac 1")
}

pub fn prepared(flow: CheckoutFlow, kind: IntentKind, id: &str) -> PreparedCheckout {
    let intent = Intent::from_client_secret(
        kind,
        ClientSecret::new(format!("{}_secret_abc", id)),
        20,
        "chf",
    )
    .expect("well-formed secret");
    PreparedCheckout {
        flow,
        intent,
        donor: donor(),
    }
}

pub fn one_time(id: &str) -> PreparedCheckout {
    prepared(CheckoutFlow::OneTimeGift, IntentKind::OneTime, id)
}
