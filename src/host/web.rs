use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use futures::future::LocalBoxFuture;
use js_sys::{Function, Reflect};
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::{console, CustomEvent, Document, Element, Event, Window};

use super::{Host, ListenerId, NavigationCallback};
use crate::error::{AdapterError, Result};
use crate::navigation::NavigationEvent;
use crate::target::element::ELEMENT_CLASS;

/// Global set on `window` when the fragment should run without a shell.
pub const DEFAULT_STANDALONE_FLAG: &str = "__KINESIS_STANDALONE__";

/// The browser page, accessed through [`web_sys`].
pub struct WebHost {
    window: Window,
    document: Document,

    /// Name of the `window` property that marks standalone execution.
    standalone_flag: String,

    /// Registered listeners, kept so that the same [`Function`] can be handed back to
    /// `removeEventListener`.
    listeners: RefCell<HashMap<ListenerId, (String, Function)>>,
    next_listener: Cell<usize>,
}

impl WebHost {
    pub fn new() -> Result<Rc<Self>> {
        Self::with_standalone_flag(DEFAULT_STANDALONE_FLAG)
    }

    /// Create a host that reads the standalone marker from `window[flag]`.
    pub fn with_standalone_flag(flag: &str) -> Result<Rc<Self>> {
        // Configure the panic hook to log to console.error
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let window = web_sys::window()
            .ok_or_else(|| AdapterError::Dom("no global `window` exists".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| AdapterError::Dom("no document on window".to_string()))?;

        Ok(Rc::new(Self {
            window,
            document,
            standalone_flag: flag.to_string(),
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        }))
    }
}

pub(crate) fn dom_error(err: JsValue) -> AdapterError {
    AdapterError::Dom(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// Pull the `{ to, from }` detail out of the shell's event.
fn navigation_detail(event: &Event) -> Option<NavigationEvent> {
    let detail = event.dyn_ref::<CustomEvent>()?.detail();

    let to = Reflect::get(&detail, &"to".into()).ok()?.as_string()?;
    let from = Reflect::get(&detail, &"from".into())
        .ok()
        .and_then(|from| from.as_string())
        .unwrap_or_default();

    Some(NavigationEvent { to, from })
}

impl Host for WebHost {
    type Element = Element;

    fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        self.document
            .query_selector(selector)
            .map_err(|_| AdapterError::InvalidSelector {
                selector: selector.to_string(),
            })
    }

    fn is_connected(&self, element: &Element) -> bool {
        element.is_connected()
    }

    fn create_element(&self, tag: &str) -> Result<Element> {
        self.document.create_element(tag).map_err(dom_error)
    }

    fn set_attribute(&self, element: &Element, name: &str, value: &str) -> Result<()> {
        element.set_attribute(name, value).map_err(dom_error)
    }

    fn append_to_body(&self, element: &Element) -> Result<()> {
        self.document
            .body()
            .ok_or_else(|| AdapterError::Dom("document has no body".to_string()))?
            .append_child(element)
            .map_err(dom_error)?;

        Ok(())
    }

    fn remove_element(&self, element: &Element) {
        element.remove();
    }

    fn is_element_defined(&self, tag: &str) -> bool {
        !self.window.custom_elements().get(tag).is_undefined()
    }

    fn define_element(&self, tag: &str) -> Result<()> {
        let class = Function::new_no_args(ELEMENT_CLASS)
            .call0(&JsValue::NULL)
            .map_err(dom_error)?;

        self.window
            .custom_elements()
            .define(tag, class.unchecked_ref())
            .map_err(dom_error)
    }

    fn inject_style(&self, css: &str) -> Result<()> {
        let style = self.document.create_element("style").map_err(dom_error)?;
        style.set_text_content(Some(css));

        self.document
            .head()
            .ok_or_else(|| AdapterError::Dom("document has no head".to_string()))?
            .append_child(&style)
            .map_err(dom_error)?;

        Ok(())
    }

    fn location(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn is_standalone(&self) -> bool {
        Reflect::get(&self.window, &JsValue::from_str(&self.standalone_flag))
            .ok()
            .and_then(|flag| flag.as_bool())
            .unwrap_or(false)
    }

    fn listen(&self, event: &str, callback: NavigationCallback) -> Result<ListenerId> {
        let function: Function = Closure::<dyn Fn(Event)>::new(move |event: Event| {
            if let Some(detail) = navigation_detail(&event) {
                callback(&detail);
            }
        })
        .into_js_value()
        .unchecked_into();

        self.window
            .add_event_listener_with_callback(event, &function)
            .map_err(dom_error)?;

        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .insert(id, (event.to_string(), function));

        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        let Some((event, function)) = self.listeners.borrow_mut().remove(&id) else {
            return;
        };

        if let Err(err) = self
            .window
            .remove_event_listener_with_callback(&event, &function)
        {
            tracing::warn!(error = ?err, %event, "failed to remove navigation listener");
        }
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn console_log(&self, message: &str) {
        console::log_1(&message.into());
    }
}
