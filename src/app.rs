use std::{cell::RefCell, fmt, rc::Rc};

use futures::future::LocalBoxFuture;
use serde_json::{Map, Value};

use crate::error::Result;

/// Props key under which the shell passes an explicit element.
pub const ELEMENT_KEY: &str = "domElement";

/// Props key under which the shell passes the fragment's name.
pub const NAME_KEY: &str = "name";

/// Shared reference to the mounted application. The lifecycle owns the only long-lived copy; the
/// handle returned from [`crate::Lifecycle::mount()`] lets the caller inspect it.
pub type InstanceHandle<A> = Rc<RefCell<A>>;

/// Props supplied by the shell to a single `mount` or `update` call.
#[derive(Clone)]
pub struct MountProps<E> {
    /// Explicit element to mount within. Only used if it is attached to the document.
    pub element: Option<E>,

    /// Name of the fragment, used to tag a synthesized container.
    pub name: Option<String>,

    /// Arbitrary pass-through data.
    pub data: Map<String, Value>,
}

impl<E> Default for MountProps<E> {
    fn default() -> Self {
        Self {
            element: None,
            name: None,
            data: Map::new(),
        }
    }
}

impl<E> MountProps<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, element: E) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_name<S>(mut self, name: S) -> Self
    where
        S: Into<String>,
    {
        self.name = Some(name.into());
        self
    }

    /// Add a pass-through value.
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Value of a single entry of the props object handed over by the shell.
pub enum PropValue<E> {
    Element(E),
    Json(Value),
}

impl<E> MountProps<E> {
    /// Route one entry of the shell's props object. An element under [`ELEMENT_KEY`] becomes the
    /// explicit target, a string under [`NAME_KEY`] becomes the name, and every other JSON entry
    /// is passed through. Anything else is dropped.
    pub fn insert_entry(&mut self, key: String, value: PropValue<E>) {
        match value {
            PropValue::Element(element) if key == ELEMENT_KEY => self.element = Some(element),
            PropValue::Json(Value::String(name)) if key == NAME_KEY => self.name = Some(name),
            PropValue::Json(value) if key != ELEMENT_KEY && key != NAME_KEY => {
                self.data.insert(key, value);
            }
            _ => tracing::trace!(%key, "ignoring unusable prop"),
        }
    }
}

impl<E> fmt::Debug for MountProps<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountProps")
            .field("element", &self.element.is_some())
            .field("name", &self.name)
            .field("data", &self.data)
            .finish()
    }
}

/// The fragment's router, as far as navigation synchronisation is concerned.
pub trait Router {
    /// The full path (including query and hash) of the currently resolved route, or [`None`] if
    /// no route matched.
    fn current_path(&self) -> Option<String>;

    /// Navigate to `path`, replacing the current history entry.
    fn replace(&self, path: &str);

    /// Resolve `path` from scratch and overwrite the current route record, bypassing any cached
    /// route.
    fn resolve(&self, path: &str);

    /// Run `callback` once the router has finished its initial navigation. Routers without an
    /// asynchronous start-up can rely on the default, which runs it immediately.
    fn when_ready(&self, callback: Box<dyn FnOnce()>) {
        callback();
    }
}

/// Globally visible configuration surface of an application instance. Shell updates are merged in
/// here, and the fragment's router is published here for the navigation synchroniser.
#[derive(Default)]
pub struct GlobalProperties {
    values: Map<String, Value>,
    router: Option<Rc<dyn Router>>,
}

impl GlobalProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<Value>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.values.insert(key.into(), value.into())
    }

    /// Merge every entry of `values` in, overwriting existing keys.
    pub fn merge(&mut self, values: &Map<String, Value>) {
        self.values
            .extend(values.iter().map(|(key, value)| (key.clone(), value.clone())));
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn router(&self) -> Option<Rc<dyn Router>> {
        self.router.as_ref().map(Rc::clone)
    }

    pub fn set_router(&mut self, router: Rc<dyn Router>) {
        self.router = Some(router);
    }
}

impl fmt::Debug for GlobalProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalProperties")
            .field("values", &self.values)
            .field("router", &self.router.is_some())
            .finish()
    }
}

/// Completion of an attachment started by [`Application::attach()`].
pub type AttachFuture = LocalBoxFuture<'static, Result<()>>;

/// Contract the adapter needs from the UI framework's application instance. The framework
/// handles rendering; the adapter only decides when and where the instance is attached.
pub trait Application<E> {
    /// Start attaching the application's root within `target`, which is guaranteed to be
    /// attached to the document. The returned future resolves once the framework has finished
    /// attaching. It must not borrow the instance, as the instance stays reachable while it is
    /// pending.
    fn attach(&mut self, target: &E) -> AttachFuture;

    /// Remove everything mounted in [`Self::attach()`] from the document. Also called when an
    /// attachment failed or was abandoned part way.
    fn detach(&mut self);

    fn globals(&self) -> &GlobalProperties;

    fn globals_mut(&mut self) -> &mut GlobalProperties;
}

/// Builds a fresh application instance for a mount. Receiving the props lets the options be
/// derived per mount rather than fixed at construction.
pub type RootFn<A, E> = dyn Fn(&MountProps<E>) -> A;
