//! wasm-bindgen externs for the slice of Stripe.js v3 the checkout flows touch.
//!
//! Every promise resolves to a plain `{ error?, paymentIntent?, setupIntent? }`
//! object; decoding happens in `client.rs`.

use wasm_bindgen::prelude::*;
use web_sys::js_sys::Promise;

// window.Stripe
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = Stripe, js_namespace = window)]
    #[derive(Debug, Clone)]
    pub type JsStripe;

    /// Throws when the publishable key is malformed.
    #[wasm_bindgen(catch, js_name = Stripe, js_namespace = window)]
    pub fn new_stripe(publishable_key: &str) -> Result<JsStripe, JsValue>;

    #[wasm_bindgen(method, catch, js_name = elements)]
    pub fn elements(this: &JsStripe, options: JsValue) -> Result<JsElements, JsValue>;

    /// Never settles when the browser is sent to a redirect-based method.
    #[wasm_bindgen(method, catch, js_name = confirmPayment)]
    pub fn confirm_payment(this: &JsStripe, options: JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = confirmSetup)]
    pub fn confirm_setup(this: &JsStripe, options: JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = retrievePaymentIntent)]
    pub fn retrieve_payment_intent(this: &JsStripe, client_secret: &str) -> Result<Promise, JsValue>;
}

// stripe.elements(...)
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = Elements)]
    #[derive(Debug, Clone)]
    pub type JsElements;

    #[wasm_bindgen(method, catch, js_name = create)]
    pub fn create_element(
        this: &JsElements,
        kind: &str,
        options: JsValue,
    ) -> Result<JsPaymentElement, JsValue>;

    /// Local field validation, run before any confirm call.
    #[wasm_bindgen(method, catch, js_name = submit)]
    pub fn submit(this: &JsElements) -> Result<Promise, JsValue>;
}

// elements.create("payment", ...)
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = PaymentElement)]
    #[derive(Debug, Clone)]
    pub type JsPaymentElement;

    #[wasm_bindgen(method, catch, js_name = mount)]
    pub fn mount(this: &JsPaymentElement, selector: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = unmount)]
    pub fn unmount(this: &JsPaymentElement) -> Result<(), JsValue>;
}
