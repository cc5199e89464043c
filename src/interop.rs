//! Yew hook that loads Stripe.js v3 at runtime.
//!
//! `use_stripejs()` injects a single
//! `<script id="stripejs-sdk" src="https://js.stripe.com/v3/" defer>` into
//! `<head>` on first use and returns `false` until `window.Stripe` exists.
//!
//! ```rust,ignore
//! #[function_component(App)]
//! fn app() -> Html {
//!     let stripe_ready = use_stripejs();
//!     html! { if stripe_ready { <Checkout /> } else { <p>{"Loading payment form..."}</p> } }
//! }
//! ```

use tracing::{debug, warn};
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::js_sys::Reflect;
use web_sys::{Document, HtmlScriptElement};
use yew::functional::hook;
use yew::prelude::*;

pub const SCRIPT_ID: &str = "stripejs-sdk";
pub const SCRIPT_SRC: &str = "https://js.stripe.com/v3/";

fn stripe_present() -> bool {
    web_sys::window()
        .and_then(|win| Reflect::has(&win, &JsValue::from_str("Stripe")).ok())
        .unwrap_or(false)
}

/// Load Stripe.js exactly once and track readiness.
#[hook]
pub fn use_stripejs() -> bool {
    let loaded = use_state(stripe_present);

    {
        let loaded = loaded.clone();
        use_effect_with((), move |_| {
            if !*loaded {
                let on_load = Closure::<dyn Fn()>::new(move || loaded.set(true));
                if let Err(err) = attach_script(on_load.as_ref().unchecked_ref()) {
                    warn!(error = ?err, "failed to load Stripe.js");
                }
                // Lives until the load event.
                on_load.forget();
            }
            || ()
        });
    }

    *loaded
}

fn attach_script(on_load: &web_sys::js_sys::Function) -> Result<(), JsValue> {
    let document: Document = web_sys::window()
        .and_then(|win| win.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    if let Some(existing) = document.get_element_by_id(SCRIPT_ID) {
        debug!("Stripe.js script already injected, waiting for load");
        return existing.add_event_listener_with_callback("load", on_load);
    }

    let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
    script.set_id(SCRIPT_ID);
    script.set_src(SCRIPT_SRC);
    script.set_defer(true);
    script.set_onload(Some(on_load));

    document
        .head()
        .ok_or_else(|| JsValue::from_str("no head element"))?
        .append_child(&script)?;
    debug!("Stripe.js script injected");
    Ok(())
}
