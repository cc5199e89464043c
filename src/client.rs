//! Typed Stripe.js client.
//!
//! [`StripeJsProcessor`] owns a mounted Payment Element and implements the
//! [`Processor`] port on top of the raw bindings. The shape of Stripe.js
//! results and errors is known only to this module: errors are classified
//! into a [`ProcessorFailure`] before they leave it.
//!
//! ```rust,ignore
//! let options = ElementsOptions { client_secret: secret.expose().to_string(), appearance: None };
//! let processor = mount_payment_element(&config.publishable_key, options, "#payment-element", None)?;
//! let controller = ConfirmationController::new(Rc::new(processor), navigator, notifier, config);
//! ```

use async_trait::async_trait;
use gloo_utils::format::JsValueSerdeExt;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use tracing::debug;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::js_sys::{Object, Promise, Reflect};

use crate::bindings::{new_stripe, JsElements, JsPaymentElement, JsStripe};
use crate::error::ProcessorFailure;
use crate::ports::{
    ConfirmPaymentRequest, ConfirmSetupRequest, Confirmation, PaymentIntentSnapshot, Processor,
};
use crate::types::{BillingDetails, ClientSecret, IntentId, IntentStatus};

/// Binds one intent's client secret to an Elements group.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ElementsOptions {
    /// The intent client secret returned by the backend.
    #[serde(rename = "clientSecret")]
    pub client_secret: String,

    /// Passed through to Stripe untouched.
    #[serde(rename = "appearance", skip_serializing_if = "Option::is_none")]
    pub appearance: Option<serde_json::Value>,
}

/// Optional layout of the mounted Payment Element.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentElementOptions {
    /// `"tabs"` or `"accordion"`; Stripe picks when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

/// The `error` member of a rejected Stripe.js result.
#[derive(Clone, Debug, Deserialize)]
pub struct StripeError {
    #[serde(default)]
    pub message: Option<String>,
    /// Stripe's error type, e.g. `"card_error"`.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Stripe's error code, e.g. `"card_declined"`.
    #[serde(default)]
    pub code: Option<String>,
}

impl From<StripeError> for ProcessorFailure {
    fn from(err: StripeError) -> Self {
        ProcessorFailure::from_raw(err.error_type.as_deref(), err.message, err.code)
    }
}

#[derive(Deserialize)]
struct RawPaymentIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
}

impl From<RawPaymentIntent> for PaymentIntentSnapshot {
    fn from(raw: RawPaymentIntent) -> Self {
        Self {
            id: IntentId::new(raw.id),
            client_secret: raw.client_secret.map(ClientSecret::new),
            status: IntentStatus::parse(&raw.status),
        }
    }
}

#[derive(Deserialize)]
struct RawSetupIntent {
    id: String,
}

/// Resolved value of every Stripe.js promise used here.
#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    error: Option<StripeError>,
    #[serde(rename = "paymentIntent", default)]
    payment_intent: Option<RawPaymentIntent>,
    #[serde(rename = "setupIntent", default)]
    setup_intent: Option<RawSetupIntent>,
}

impl RawResult {
    fn into_ok(self) -> Result<Self, ProcessorFailure> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self),
        }
    }
}

#[derive(Serialize)]
struct ConfirmParams<'a> {
    return_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_method_data: Option<PaymentMethodData<'a>>,
}

#[derive(Serialize)]
struct PaymentMethodData<'a> {
    billing_details: &'a BillingDetails,
}

/// Stripe.js handle plus, once mounted, the Payment Element it confirms.
#[derive(Debug, Clone)]
pub struct StripeJsProcessor {
    stripe: JsStripe,
    mounted: Option<Mounted>,
}

#[derive(Debug, Clone)]
struct Mounted {
    elements: JsElements,
    payment_element: JsPaymentElement,
}

/// Initialize Stripe.js, create an Elements group bound to the intent's
/// client secret, and mount a Payment Element at `selector`.
pub fn mount_payment_element(
    publishable_key: &str,
    elements_options: ElementsOptions,
    selector: &str,
    pe_options: Option<PaymentElementOptions>,
) -> Result<StripeJsProcessor, ProcessorFailure> {
    StripeJsProcessor::new(publishable_key)?.mount(elements_options, selector, pe_options)
}

impl StripeJsProcessor {
    /// A handle without a Payment Element. Enough for intent retrieval on a
    /// landing page; `submit` and the confirm calls need [`Self::mount`].
    pub fn new(publishable_key: &str) -> Result<Self, ProcessorFailure> {
        let stripe = new_stripe(publishable_key).map_err(js_failure)?;
        Ok(Self {
            stripe,
            mounted: None,
        })
    }

    pub fn mount(
        self,
        elements_options: ElementsOptions,
        selector: &str,
        pe_options: Option<PaymentElementOptions>,
    ) -> Result<Self, ProcessorFailure> {
        let elements = self
            .stripe
            .elements(to_value(&elements_options).map_err(serde_failure)?)
            .map_err(js_failure)?;

        let pe_options = match pe_options {
            Some(options) => to_value(&options).map_err(serde_failure)?,
            None => JsValue::undefined(),
        };
        let payment_element = elements
            .create_element("payment", pe_options)
            .map_err(js_failure)?;
        payment_element.mount(selector).map_err(js_failure)?;
        debug!(selector, "payment element mounted");

        Ok(Self {
            stripe: self.stripe,
            mounted: Some(Mounted {
                elements,
                payment_element,
            }),
        })
    }

    /// Tear down the Payment Element so the container can be reused.
    pub fn unmount(&self) -> Result<(), ProcessorFailure> {
        match &self.mounted {
            Some(mounted) => mounted.payment_element.unmount().map_err(js_failure),
            None => Ok(()),
        }
    }

    fn elements(&self) -> Result<&JsElements, ProcessorFailure> {
        self.mounted
            .as_ref()
            .map(|m| &m.elements)
            .ok_or_else(|| ProcessorFailure::unexpected("Payment form is not ready"))
    }

    /// `{ elements, confirmParams, redirect: "if_required" }`. The client
    /// secret is already bound to `elements`.
    fn confirm_options(&self, confirm_params: &ConfirmParams<'_>) -> Result<JsValue, ProcessorFailure> {
        let opts = Object::new();
        set(&opts, "elements", self.elements()?.as_ref())?;
        set(&opts, "confirmParams", &to_value(confirm_params).map_err(serde_failure)?)?;
        set(&opts, "redirect", &JsValue::from_str("if_required"))?;
        Ok(opts.into())
    }
}

#[async_trait(?Send)]
impl Processor for StripeJsProcessor {
    async fn submit(&self) -> Result<(), ProcessorFailure> {
        resolve(self.elements()?.submit()).await?.into_ok().map(|_| ())
    }

    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<Confirmation, ProcessorFailure> {
        let options = self.confirm_options(&ConfirmParams {
            return_url: &request.return_url,
            payment_method_data: Some(PaymentMethodData {
                billing_details: &request.billing_details,
            }),
        })?;
        let result = resolve(self.stripe.confirm_payment(options)).await?.into_ok()?;
        Ok(match result.payment_intent {
            Some(intent) => Confirmation::Concluded(intent.into()),
            None => Confirmation::Redirected,
        })
    }

    async fn confirm_setup(
        &self,
        request: ConfirmSetupRequest,
    ) -> Result<Confirmation, ProcessorFailure> {
        let options = self.confirm_options(&ConfirmParams {
            return_url: &request.return_url,
            payment_method_data: None,
        })?;
        let result = resolve(self.stripe.confirm_setup(options)).await?.into_ok()?;
        Ok(match result.setup_intent {
            Some(setup) => {
                debug!(setup_intent = %setup.id, "setup intent confirmed in-page");
                Confirmation::SetupConfirmed
            }
            None => Confirmation::Redirected,
        })
    }

    async fn retrieve_payment_intent(
        &self,
        client_secret: &ClientSecret,
    ) -> Result<PaymentIntentSnapshot, ProcessorFailure> {
        let result = resolve(self.stripe.retrieve_payment_intent(client_secret.expose()))
            .await?
            .into_ok()?;
        result
            .payment_intent
            .map(PaymentIntentSnapshot::from)
            .ok_or_else(|| ProcessorFailure::unexpected("No payment intent returned"))
    }
}

async fn resolve(promise: Result<Promise, JsValue>) -> Result<RawResult, ProcessorFailure> {
    let promise = promise.map_err(js_failure)?;
    let value = JsFuture::from(promise).await.map_err(js_failure)?;
    if value.is_undefined() || value.is_null() {
        return Ok(RawResult {
            error: None,
            payment_intent: None,
            setup_intent: None,
        });
    }
    from_value(value).map_err(serde_failure)
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), ProcessorFailure> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(js_failure)
}

/// Best-effort conversion of a thrown `JsValue`.
fn js_failure(value: JsValue) -> ProcessorFailure {
    match from_value::<StripeError>(value.clone()) {
        Ok(err) if err.message.is_some() => err.into(),
        _ => ProcessorFailure::unexpected(
            value
                .as_string()
                .or_else(|| value.into_serde::<serde_json::Value>().ok().map(|v| v.to_string()))
                .unwrap_or_else(|| format!("{:?}", value)),
        ),
    }
}

fn serde_failure(err: serde_wasm_bindgen::Error) -> ProcessorFailure {
    ProcessorFailure::unexpected(err.to_string())
}
