//! Drop-in Yew checkout form.
//!
//! Mounts the Payment Element for a prepared intent and runs
//! [`ConfirmationController`] when the customer pays. Card and validation
//! errors stay inline next to the form; everything else goes out through
//! `on_event`.

use std::rc::Rc;

use tracing::{debug, error};
use yew::prelude::*;

use crate::browser::{BrowserNavigator, CallbackNavigator, CallbackNotifier};
use crate::client::{ElementsOptions, PaymentElementOptions, StripeJsProcessor};
use crate::components::{InlineError, PayButton};
use crate::config::CheckoutConfig;
use crate::confirmation::{ConfirmationController, Outcome};
use crate::error::CheckoutError;
use crate::interop::use_stripejs;
use crate::ports::{Navigator, Notifier, Processor};
use crate::types::{CheckoutEvent, PreparedCheckout};

pub const PAYMENT_ELEMENT_ID: &str = "stripe-payment-element";

/// Properties for [`StripeCheckout`].
///
/// * `checkout` – the intent and donor returned by intent creation.
/// * `navigate` – in-app navigation; full page loads through `location.href` when unset.
/// * `on_event` – every [`CheckoutEvent`] the flow emits.
/// * `on_outcome` – the result of a confirmation that did not fail.
#[derive(Properties, PartialEq, Clone)]
pub struct StripeCheckoutProps {
    pub config: Rc<CheckoutConfig>,
    pub checkout: PreparedCheckout,
    #[prop_or_default]
    pub payment_element_options: Option<PaymentElementOptions>,
    #[prop_or_default]
    pub on_event: Callback<CheckoutEvent>,
    #[prop_or_default]
    pub on_outcome: Callback<Outcome>,
    #[prop_or_default]
    pub navigate: Option<Callback<String>>,
    #[prop_or_default]
    pub button_label: Option<String>,
    #[prop_or_default]
    pub children: Children,
}

/// Renders the Payment Element and a pay button for one prepared checkout.
///
/// ```rust,ignore
/// html! {
///     <StripeCheckout config={config.clone()} checkout={prepared} on_event={on_event}>
///         <p>{ "Membership renewal – CHF 50" }</p>
///     </StripeCheckout>
/// }
/// ```
#[function_component(StripeCheckout)]
pub fn stripe_checkout(props: &StripeCheckoutProps) -> Html {
    let stripe_ready = use_stripejs();
    let controller = use_state(|| None::<Rc<ConfirmationController>>);
    let inline_error = use_state(|| None::<String>);
    let submitting = use_state(|| false);

    // Mount once Stripe.js is loaded, and again for a new intent.
    {
        let controller = controller.clone();
        let inline_error = inline_error.clone();
        let props = props.clone();
        let secret = props.checkout.intent.client_secret.expose().to_string();
        use_effect_with((stripe_ready, secret), move |(ready, secret)| {
            let mut mounted: Option<Rc<StripeJsProcessor>> = None;
            if *ready {
                let options = ElementsOptions {
                    client_secret: secret.clone(),
                    appearance: None,
                };
                let selector = format!("#{}", PAYMENT_ELEMENT_ID);
                let result = StripeJsProcessor::new(&props.config.publishable_key).and_then(|p| {
                    p.mount(options, &selector, props.payment_element_options.clone())
                });
                match result {
                    Ok(processor) => {
                        let processor = Rc::new(processor);
                        let navigator: Rc<dyn Navigator> = match &props.navigate {
                            Some(cb) => Rc::new(CallbackNavigator(cb.clone())),
                            None => Rc::new(BrowserNavigator),
                        };
                        let notifier: Rc<dyn Notifier> =
                            Rc::new(CallbackNotifier(props.on_event.clone()));
                        let port: Rc<dyn Processor> = processor.clone();
                        controller.set(Some(Rc::new(ConfirmationController::new(
                            port,
                            navigator,
                            notifier,
                            Rc::clone(&props.config),
                        ))));
                        mounted = Some(processor);
                    }
                    Err(failure) => {
                        error!(error = %failure.message, "payment element failed to mount");
                        inline_error.set(Some(CheckoutError::from(failure).user_message()));
                    }
                }
            }
            move || {
                if let Some(processor) = mounted {
                    if let Err(failure) = processor.unmount() {
                        debug!(error = %failure.message, "payment element unmount failed");
                    }
                }
            }
        });
    }

    let on_click = {
        let controller = controller.clone();
        let submitting = submitting.clone();
        let inline_error = inline_error.clone();
        let checkout = props.checkout.clone();
        let on_outcome = props.on_outcome.clone();

        Callback::from(move |_: MouseEvent| {
            if *submitting {
                return;
            }
            let Some(controller) = (*controller).clone() else {
                return;
            };
            submitting.set(true);
            inline_error.set(None);

            let submitting = submitting.clone();
            let inline_error = inline_error.clone();
            let checkout = checkout.clone();
            let on_outcome = on_outcome.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match controller.confirm_prepared(&checkout).await {
                    // Navigation is underway; the button stays locked.
                    Ok(outcome) => on_outcome.emit(outcome),
                    // The outstanding call owns the button state.
                    Err(CheckoutError::ConfirmationInFlight(_)) => {}
                    Err(err) => {
                        if err.is_recoverable() {
                            inline_error.set(Some(err.user_message()));
                        }
                        submitting.set(false);
                    }
                }
            });
        })
    };

    let label = props
        .button_label
        .clone()
        .unwrap_or_else(|| format!("Pay {} {}", props.checkout.intent.amount, props.checkout.intent.currency.to_uppercase()));

    html! {
        <div class="ysf-checkout">
            { for props.children.iter() }
            <div id={PAYMENT_ELEMENT_ID} class="ysf-payment-element" />
            <PayButton
                label={label}
                onclick={on_click}
                busy={*submitting}
                disabled={controller.is_none()}
            />
            <InlineError message={(*inline_error).clone()} />
        </div>
    }
}
