//! Yew landing page for redirect and in-app returns.

use std::rc::Rc;

use tracing::debug;
use yew::prelude::*;

use crate::browser::{
    BrowserLocation, BrowserNavigator, CallbackNavigator, CallbackNotifier, GlooTransport,
    LocalStorageToken, PlatformTimer,
};
use crate::client::StripeJsProcessor;
use crate::components::StatusBanner;
use crate::config::CheckoutConfig;
use crate::error::CheckoutError;
use crate::interop::use_stripejs;
use crate::landing::{LandingOutcome, ReconcileStrategy, ReturnLanding};
use crate::lifecycle::TaskGuard;
use crate::ports::{CheckoutPorts, Navigator};
use crate::types::{CheckoutEvent, CheckoutFlow};

#[derive(Properties, PartialEq, Clone)]
pub struct PaymentLandingProps {
    pub flow: CheckoutFlow,
    pub config: Rc<CheckoutConfig>,
    /// Overrides the flow's default reconciliation path.
    #[prop_or_default]
    pub strategy: Option<ReconcileStrategy>,
    #[prop_or_default]
    pub on_event: Callback<CheckoutEvent>,
    #[prop_or_default]
    pub navigate: Option<Callback<String>>,
    /// Shown when the page was opened directly.
    #[prop_or_default]
    pub children: Children,
}

/// Finalizes the payment referenced by the current URL on mount. Unmounting
/// aborts any outstanding poll or navigation delay.
#[function_component(PaymentLanding)]
pub fn payment_landing(props: &PaymentLandingProps) -> Html {
    let stripe_ready = use_stripejs();
    let latest = use_state(|| None::<CheckoutEvent>);
    let direct = use_state(|| false);

    {
        let latest = latest.clone();
        let direct = direct.clone();
        let props = props.clone();
        use_effect_with(stripe_ready, move |ready| {
            let mut guard: Option<TaskGuard> = None;
            if *ready {
                match StripeJsProcessor::new(&props.config.publishable_key) {
                    Ok(processor) => {
                        let ports = browser_ports(&props, processor, latest.clone());
                        let strategy = props
                            .strategy
                            .unwrap_or_else(|| ReconcileStrategy::for_flow(props.flow));
                        let landing = ReturnLanding::with_strategy(props.flow, strategy, &ports);
                        guard = Some(TaskGuard::spawn("payment_landing", async move {
                            match landing.enter().await {
                                Ok(LandingOutcome::Direct) => direct.set(true),
                                Ok(outcome) => debug!(?outcome, "landing settled"),
                                Err(err) => debug!(error = %err, "landing settled without success"),
                            }
                        }));
                    }
                    Err(failure) => latest.set(Some(CheckoutEvent::Error {
                        title: "Error".to_string(),
                        message: CheckoutError::from(failure).user_message(),
                    })),
                }
            }
            move || drop(guard)
        });
    }

    if *direct {
        return html! { <>{ for props.children.iter() }</> };
    }
    html! { <StatusBanner event={(*latest).clone()} /> }
}

fn browser_ports(
    props: &PaymentLandingProps,
    processor: StripeJsProcessor,
    latest: UseStateHandle<Option<CheckoutEvent>>,
) -> CheckoutPorts {
    let on_event = props.on_event.clone();
    let notifier = CallbackNotifier(Callback::from(move |event: CheckoutEvent| {
        latest.set(Some(event.clone()));
        on_event.emit(event);
    }));
    let navigator: Rc<dyn Navigator> = match &props.navigate {
        Some(cb) => Rc::new(CallbackNavigator(cb.clone())),
        None => Rc::new(BrowserNavigator),
    };
    CheckoutPorts {
        processor: Rc::new(processor),
        transport: Rc::new(GlooTransport),
        tokens: Rc::new(LocalStorageToken::default()),
        notifier: Rc::new(notifier),
        location: Rc::new(BrowserLocation),
        navigator,
        timer: Rc::new(PlatformTimer),
        config: Rc::clone(&props.config),
    }
}
