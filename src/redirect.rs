//! Redirect-return handling.
//!
//! After a redirect-based payment method, the processor sends the browser back
//! to the flow's return path with `payment_intent`, `payment_intent_client_secret`
//! and `redirect_status` appended. [`RedirectReconciler`] turns that URL into a
//! terminal outcome exactly once and strips the parameters afterwards. A
//! retrieved `processing` status is settled through [`StatusPoller`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult, PAYMENT_FAILED_MESSAGE};
use crate::poller::{StatusPoller, TerminalStatus};
use crate::ports::{CheckoutPorts, Location, Navigator, Notifier, Processor, Timer};
use crate::types::{CheckoutEvent, CheckoutFlow, ClientSecret, IntentId, IntentStatus};

// Query keys the processor appends to the return URL.
pub const PAYMENT_INTENT: &str = "payment_intent";
pub const PAYMENT_INTENT_CLIENT_SECRET: &str = "payment_intent_client_secret";
pub const REDIRECT_STATUS: &str = "redirect_status";

/// The return-URL parameters the processor appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnParams {
    pub payment_intent: Option<IntentId>,
    pub client_secret: Option<ClientSecret>,
    pub redirect_status: Option<String>,
}

impl ReturnParams {
    /// Parse a query string, with or without its leading `?`.
    pub fn parse(search: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(search.trim_start_matches('?').as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                PAYMENT_INTENT => params.payment_intent = Some(IntentId::new(value)),
                PAYMENT_INTENT_CLIENT_SECRET => {
                    params.client_secret = Some(ClientSecret::new(value))
                }
                REDIRECT_STATUS => params.redirect_status = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// The intent id and secret, when both are present.
    pub fn redirect_key(&self) -> Option<(&IntentId, &ClientSecret)> {
        self.payment_intent.as_ref().zip(self.client_secret.as_ref())
    }
}

/// `path?payment_intent=..&payment_intent_client_secret=..&redirect_status=..`
pub fn completion_url(
    path: &str,
    intent: &IntentId,
    secret: &ClientSecret,
    redirect_status: &str,
) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(PAYMENT_INTENT, intent.as_str())
        .append_pair(PAYMENT_INTENT_CLIENT_SECRET, secret.expose())
        .append_pair(REDIRECT_STATUS, redirect_status)
        .finish();
    format!("{}?{}", path, query)
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// No redirect parameters: the page was reached directly.
    NotApplicable,
    /// The parameters were already processed during this page session.
    AlreadyProcessed,
    /// Payment succeeded; navigation to `destination` was scheduled.
    Succeeded { destination: String },
}

/// Finalizes one flow's redirect returns, at most once per (intent, secret) pair.
pub struct RedirectReconciler {
    flow: CheckoutFlow,
    processor: Rc<dyn Processor>,
    location: Rc<dyn Location>,
    navigator: Rc<dyn Navigator>,
    notifier: Rc<dyn Notifier>,
    timer: Rc<dyn Timer>,
    config: Rc<CheckoutConfig>,
    poller: StatusPoller,
    processed: RefCell<HashSet<(IntentId, ClientSecret)>>,
}

impl RedirectReconciler {
    /// `poller` settles intents the processor still reports as processing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flow: CheckoutFlow,
        processor: Rc<dyn Processor>,
        location: Rc<dyn Location>,
        navigator: Rc<dyn Navigator>,
        notifier: Rc<dyn Notifier>,
        timer: Rc<dyn Timer>,
        config: Rc<CheckoutConfig>,
        poller: StatusPoller,
    ) -> Self {
        Self {
            flow,
            processor,
            location,
            navigator,
            notifier,
            timer,
            config,
            poller,
            processed: RefCell::new(HashSet::new()),
        }
    }

    /// Reconciler for `flow` wired to the shared ports.
    pub fn from_ports(flow: CheckoutFlow, ports: &CheckoutPorts) -> Self {
        Self::new(
            flow,
            Rc::clone(&ports.processor),
            Rc::clone(&ports.location),
            Rc::clone(&ports.navigator),
            Rc::clone(&ports.notifier),
            Rc::clone(&ports.timer),
            Rc::clone(&ports.config),
            StatusPoller::new(ports.client(), Rc::clone(&ports.timer)),
        )
    }

    /// Inspect the current URL and finalize the payment it refers to.
    ///
    /// Emits exactly one terminal event when parameters are present. The
    /// intent is retrieved once, and the URL is stripped before any
    /// navigation is scheduled.
    pub async fn reconcile(&self) -> CheckoutResult<Reconciliation> {
        let params = ReturnParams::parse(&self.location.search());
        let Some((intent_id, secret)) = params.redirect_key() else {
            debug!(flow = %self.flow, "no redirect parameters, nothing to reconcile");
            return Ok(Reconciliation::NotApplicable);
        };

        let key = (intent_id.clone(), secret.clone());
        if !self.processed.borrow_mut().insert(key) {
            self.strip_url();
            return Ok(Reconciliation::AlreadyProcessed);
        }

        info!(
            flow = %self.flow,
            intent_id = %intent_id,
            redirect_status = params.redirect_status.as_deref().unwrap_or(""),
            "reconciling redirect return"
        );
        let retrieved = self.processor.retrieve_payment_intent(secret).await;
        self.strip_url();

        let routes = self.config.routes(self.flow);
        match retrieved {
            Ok(intent) if intent.status == IntentStatus::Succeeded => self.succeed().await,
            Ok(intent) if intent.status == IntentStatus::Processing => {
                info!(intent_id = %intent_id, "payment still processing after redirect, polling backend");
                match self.poller.poll(intent_id).await {
                    Ok(TerminalStatus::Succeeded) => self.succeed().await,
                    Ok(status) => {
                        warn!(intent_id = %intent_id, status = ?status, "polled payment did not succeed");
                        self.fail(routes.form.clone())
                    }
                    Err(err) if err.is_soft_failure() => {
                        warn!(intent_id = %intent_id, error = %err, "payment still unsettled");
                        self.notifier.emit(CheckoutEvent::StillProcessing {
                            flow: self.flow,
                            message: err.user_message(),
                        });
                        Err(err)
                    }
                    Err(err) => {
                        warn!(intent_id = %intent_id, error = %err, "status polling failed");
                        self.fail(routes.form.clone())
                    }
                }
            }
            Ok(intent) => {
                warn!(intent_id = %intent_id, status = %intent.status, "redirect payment did not succeed");
                self.fail(routes.form.clone())
            }
            Err(failure) => {
                warn!(intent_id = %intent_id, error = %failure.message, "intent retrieval failed");
                self.fail(routes.form.clone())
            }
        }
    }

    async fn succeed(&self) -> CheckoutResult<Reconciliation> {
        let destination = self.config.routes(self.flow).thank_you.clone();
        self.notifier.emit(CheckoutEvent::Succeeded {
            flow: self.flow,
            destination: destination.clone(),
        });
        self.timer.sleep(self.config.redirect_success_delay).await;
        self.navigator.navigate(&destination);
        Ok(Reconciliation::Succeeded { destination })
    }

    fn fail(&self, retry_route: String) -> CheckoutResult<Reconciliation> {
        self.notifier.emit(CheckoutEvent::Failed {
            flow: self.flow,
            message: PAYMENT_FAILED_MESSAGE.to_string(),
            retry_route,
        });
        Err(CheckoutError::PaymentFailed(PAYMENT_FAILED_MESSAGE.to_string()))
    }

    fn strip_url(&self) {
        self.location.replace(&self.location.pathname());
    }
}
