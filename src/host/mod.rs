pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::error::Result;
use crate::navigation::NavigationEvent;

/// Callback invoked with every navigation event broadcast by the shell.
pub type NavigationCallback = Rc<dyn Fn(&NavigationEvent)>;

/// Identifies a listener registered with [`Host::listen()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) usize);

/// The page the fragment is mounted into. Abstracts the document and window so that the adapter
/// can run against the browser ([`web::WebHost`]) or an in-memory page ([`memory::MemoryHost`]).
pub trait Host: 'static {
    /// A handle to an element within the page.
    type Element: Clone + 'static;

    /// Find the first element matching `selector`.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>>;

    /// Whether `element` is currently attached to the document.
    fn is_connected(&self, element: &Self::Element) -> bool;

    /// Create a detached element with the provided tag.
    fn create_element(&self, tag: &str) -> Result<Self::Element>;

    fn set_attribute(&self, element: &Self::Element, name: &str, value: &str) -> Result<()>;

    /// Append `element` as the last child of the document body.
    fn append_to_body(&self, element: &Self::Element) -> Result<()>;

    /// Detach `element` from its parent. Does nothing if it has no parent.
    fn remove_element(&self, element: &Self::Element);

    /// Whether a custom element class has already been registered for `tag`.
    fn is_element_defined(&self, tag: &str) -> bool;

    /// Register the container element class for `tag`.
    fn define_element(&self, tag: &str) -> Result<()>;

    /// Add a style sheet with the provided rules to the document.
    fn inject_style(&self, css: &str) -> Result<()>;

    /// Full URL of the current page.
    fn location(&self) -> String;

    /// Whether the fragment is running without a shell.
    fn is_standalone(&self) -> bool;

    /// Register a global listener for the navigation event named `event`.
    fn listen(&self, event: &str, callback: NavigationCallback) -> Result<ListenerId>;

    /// Remove a listener. Removing an unknown listener does nothing.
    fn unlisten(&self, id: ListenerId);

    /// Run a task on the page's event loop.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    /// Print a diagnostic message to the page console.
    fn console_log(&self, message: &str);
}

/// A registered listener. The listener is removed from the host when the guard is dropped, so that
/// every exit path out of a mount cycle releases it.
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ListenerGuard<H>
where
    H: Host,
{
    host: Rc<H>,
    id: ListenerId,
}

impl<H> ListenerGuard<H>
where
    H: Host,
{
    /// Register `callback` for `event`, returning a guard that owns the registration.
    pub fn listen(host: &Rc<H>, event: &str, callback: NavigationCallback) -> Result<Self> {
        let id = host.listen(event, callback)?;

        Ok(Self {
            host: Rc::clone(host),
            id,
        })
    }
}

impl<H> Drop for ListenerGuard<H>
where
    H: Host,
{
    fn drop(&mut self) {
        self.host.unlisten(self.id);
    }
}
