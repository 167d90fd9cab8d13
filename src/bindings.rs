//! Exposes a [`Lifecycle`] to a JavaScript shell, as an object with `bootstrap`, `mount`, `update`
//! and `unmount` functions that each return a `Promise`. `mount` resolves to the element the
//! fragment was attached within.

use std::rc::Rc;

use js_sys::{Array, Object, Promise, Reflect, JSON};
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use wasm_bindgen_futures::future_to_promise;
use web_sys::Element;

use crate::app::{Application, MountProps, PropValue};
use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::host::web::WebHost;
use crate::lifecycle::{Hook, Lifecycle};
use crate::target::MountTargetOption;

fn to_js_error(err: AdapterError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Convert a JSON-compatible JS value. Functions, `undefined` and cyclic objects are rejected.
fn to_json(value: &JsValue) -> Option<serde_json::Value> {
    let text = JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

/// Read the shell's props. Elements and JSON-compatible entries are routed by
/// [`MountProps::insert_entry()`]; anything else is skipped.
pub fn props_from_js(value: &JsValue) -> MountProps<Element> {
    let mut props = MountProps::new();

    let Some(object) = value.dyn_ref::<Object>() else {
        return props;
    };

    for entry in Object::entries(object).iter() {
        let entry: Array = entry.unchecked_into();
        let Some(key) = entry.get(0).as_string() else {
            continue;
        };
        let value = entry.get(1);

        let value = match value.dyn_into::<Element>() {
            Ok(element) => PropValue::Element(element),
            Err(value) => match to_json(&value) {
                Some(json) => PropValue::Json(json),
                None => continue,
            },
        };

        props.insert_entry(key, value);
    }

    props
}

/// Read the adapter options. `el` may either be a selector or an element; the remaining options
/// are parsed as an [`AdapterConfig`].
pub fn config_from_js(
    options: &JsValue,
) -> Result<(AdapterConfig, Option<MountTargetOption<Element>>), AdapterError> {
    if options.is_undefined() || options.is_null() {
        return Ok((AdapterConfig::default(), None));
    }

    let el = Reflect::get(options, &"el".into()).map_err(crate::host::web::dom_error)?;
    let el = el.dyn_into::<Element>().ok().map(MountTargetOption::Element);

    // Elements don't survive serialisation, so parse a copy without them.
    let options = Object::assign(&Object::new(), options.unchecked_ref());
    if el.is_some() {
        Reflect::delete_property(&options, &"el".into()).map_err(crate::host::web::dom_error)?;
    }

    let text = JSON::stringify(&options)
        .map_err(crate::host::web::dom_error)?
        .as_string()
        .unwrap_or_else(|| "{}".to_string());

    Ok((AdapterConfig::from_json(&text)?, el))
}

/// Store `function` under `name` on `object`.
fn export_fn(object: &Object, name: &str, function: JsValue) -> Result<(), JsValue> {
    Reflect::set(object, &name.into(), &function)?;
    Ok(())
}

/// Build the object handed to the shell for `lifecycle`.
pub fn export<A>(lifecycle: &Rc<Lifecycle<A, WebHost>>) -> Result<Object, JsValue>
where
    A: Application<Element> + 'static,
{
    let exports = Object::new();

    export_fn(&exports, "bootstrap", {
        let lifecycle = Rc::clone(lifecycle);
        Closure::<dyn Fn() -> Promise>::new(move || {
            let lifecycle = Rc::clone(&lifecycle);
            future_to_promise(async move {
                lifecycle.bootstrap().await.map_err(to_js_error)?;
                Ok(JsValue::UNDEFINED)
            })
        })
        .into_js_value()
    })?;

    export_fn(&exports, "mount", {
        let lifecycle = Rc::clone(lifecycle);
        Closure::<dyn Fn(JsValue) -> Promise>::new(move |props: JsValue| {
            let lifecycle = Rc::clone(&lifecycle);
            let props = props_from_js(&props);
            future_to_promise(async move {
                lifecycle.mount(&props).await.map_err(to_js_error)?;
                Ok(lifecycle.target().map_or(JsValue::UNDEFINED, JsValue::from))
            })
        })
        .into_js_value()
    })?;

    export_fn(&exports, "update", {
        let lifecycle = Rc::clone(lifecycle);
        Closure::<dyn Fn(JsValue) -> Promise>::new(move |props: JsValue| {
            match lifecycle.update(&props_from_js(&props)) {
                Ok(()) => Promise::resolve(&JsValue::UNDEFINED),
                Err(err) => Promise::reject(&to_js_error(err)),
            }
        })
        .into_js_value()
    })?;

    export_fn(&exports, "unmount", {
        let lifecycle = Rc::clone(lifecycle);
        Closure::<dyn Fn() -> Promise>::new(move || match lifecycle.unmount() {
            Ok(()) => Promise::resolve(&JsValue::UNDEFINED),
            Err(err) => Promise::reject(&to_js_error(err)),
        })
        .into_js_value()
    })?;

    Ok(exports)
}

/// Construct an adapter from JS `options` on the current page, and export its lifecycle.
pub fn lifecycles<A, F>(
    options: &JsValue,
    root: F,
    hook: Option<Hook<A, Element>>,
) -> Result<Object, JsValue>
where
    A: Application<Element> + 'static,
    F: Fn(&MountProps<Element>) -> A + 'static,
{
    let (config, el) = config_from_js(options).map_err(to_js_error)?;
    let host = WebHost::new().map_err(to_js_error)?;

    let mut builder = Lifecycle::builder(&host).config(config).root(root);
    if let Some(el) = el {
        builder = builder.el(el);
    }
    if let Some(hook) = hook {
        builder = builder.customize(hook);
    }

    export(&builder.build().map_err(to_js_error)?)
}
