use yew::prelude::*;

use crate::types::CheckoutEvent;

/// Submit button that locks while a confirmation is outstanding.
#[derive(Properties, PartialEq)]
pub struct PayButtonProps {
    pub label: String,
    pub onclick: Callback<MouseEvent>,
    /// Shows the busy label and blocks clicks.
    #[prop_or_default]
    pub busy: bool,
    #[prop_or_default]
    pub disabled: bool,
}

#[function_component(PayButton)]
pub fn pay_button(props: &PayButtonProps) -> Html {
    html! {
        <button
            type="button"
            onclick={props.onclick.clone()}
            disabled={props.disabled || props.busy}
            class="ysf-pay-button"
        >
            {
                if props.busy {
                    "Processing…".to_string()
                } else {
                    props.label.clone()
                }
            }
        </button>
    }
}

/// Card and validation errors, rendered next to the payment element.
#[derive(Properties, PartialEq)]
pub struct InlineErrorProps {
    #[prop_or_default]
    pub message: Option<String>,
}

#[function_component(InlineError)]
pub fn inline_error(props: &InlineErrorProps) -> Html {
    match &props.message {
        Some(msg) => html! { <div class="ysf-inline-error" role="alert">{ msg }</div> },
        None => Html::default(),
    }
}

#[derive(Properties, PartialEq)]
pub struct StatusBannerProps {
    /// Latest event of the flow; `None` while still working.
    #[prop_or_default]
    pub event: Option<CheckoutEvent>,
    #[prop_or(String::from("Verifying your payment…"))]
    pub pending_label: String,
}

/// Landing-page status text for the latest checkout event.
#[function_component(StatusBanner)]
pub fn status_banner(props: &StatusBannerProps) -> Html {
    match &props.event {
        None => html! { <p class="ysf-status ysf-status-pending">{ &props.pending_label }</p> },
        Some(CheckoutEvent::Succeeded { .. }) | Some(CheckoutEvent::Confirmed { .. }) => html! {
            <p class="ysf-status ysf-status-success">{ "Payment successful! Redirecting…" }</p>
        },
        Some(CheckoutEvent::Failed {
            message,
            retry_route,
            ..
        }) => html! {
            <div class="ysf-status ysf-status-failed">
                <p>{ message }</p>
                <a href={retry_route.clone()}>{ "Try again" }</a>
            </div>
        },
        Some(CheckoutEvent::StillProcessing { message, .. }) => html! {
            <p class="ysf-status ysf-status-processing">{ message }</p>
        },
        Some(CheckoutEvent::SubscriptionCancelled { message }) => html! {
            <p class="ysf-status ysf-status-success">{ message }</p>
        },
        Some(CheckoutEvent::Error { title, message }) => html! {
            <div class="ysf-status ysf-status-failed">
                <strong>{ title }</strong>
                <p>{ message }</p>
            </div>
        },
    }
}
