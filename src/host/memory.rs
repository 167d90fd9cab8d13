//! An in-memory page. Implements just enough of a document (an element tree rooted at `<body>`,
//! a custom element registry, global listeners and a task queue) to run the adapter without a
//! browser.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    fmt,
    rc::{Rc, Weak},
};

use futures::future::LocalBoxFuture;

use super::{Host, ListenerId, NavigationCallback};
use crate::error::{AdapterError, Result};
use crate::navigation::NavigationEvent;
use crate::util::HashMapList;

struct ElementData {
    tag: String,
    attributes: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<MemoryElement>>,
    parent: RefCell<Weak<ElementData>>,
}

/// Shared handle to an element of a [`MemoryHost`]. Clones refer to the same element.
#[derive(Clone)]
pub struct MemoryElement(Rc<ElementData>);

impl MemoryElement {
    fn new(tag: &str) -> Self {
        Self(Rc::new(ElementData {
            tag: tag.to_string(),
            attributes: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
        }))
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.0
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn parent(&self) -> Option<MemoryElement> {
        self.0.parent.borrow().upgrade().map(MemoryElement)
    }

    pub fn children(&self) -> Vec<MemoryElement> {
        self.0.children.borrow().clone()
    }

    /// Append `child` to this element, moving it out of its current parent first.
    pub fn append_child(&self, child: &MemoryElement) {
        child.remove();

        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Remove this element from its parent.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent
                .0
                .children
                .borrow_mut()
                .retain(|sibling| sibling != self);
        }

        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Depth first walk over this element and all of its descendants.
    fn walk(&self, visit: &mut dyn FnMut(&MemoryElement)) {
        visit(self);

        for child in self.children() {
            child.walk(visit);
        }
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => self.attribute("id").as_deref() == Some(id.as_str()),
            Selector::Tag(tag) => self.tag() == tag,
            Selector::Attribute { tag, name, value } => {
                self.tag() == tag && self.attribute(name).as_deref() == Some(value.as_str())
            }
        }
    }
}

impl PartialEq for MemoryElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryElement {}

impl fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag())?;
        for (name, value) in self.0.attributes.borrow().iter() {
            write!(f, " {name}=\"{value}\"")?;
        }
        write!(f, ">")
    }
}

/// The subset of selectors the in-memory document understands: `#id`, `tag` and
/// `tag[attribute="value"]`.
enum Selector {
    Id(String),
    Tag(String),
    Attribute {
        tag: String,
        name: String,
        value: String,
    },
}

impl Selector {
    fn parse(selector: &str) -> Option<Self> {
        let is_ident = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        };

        let selector = selector.trim();

        if let Some(id) = selector.strip_prefix('#') {
            return is_ident(id).then(|| Self::Id(id.to_string()));
        }

        if let Some((tag, rest)) = selector.split_once('[') {
            let (name, value) = rest.strip_suffix(']')?.split_once('=')?;
            let value = value.strip_prefix('"')?.strip_suffix('"')?;

            if !is_ident(tag) || !is_ident(name) {
                return None;
            }

            return Some(Self::Attribute {
                tag: tag.to_string(),
                name: name.to_string(),
                value: unescape(value)?,
            });
        }

        is_ident(selector).then(|| Self::Tag(selector.to_string()))
    }
}

/// Resolve backslash escapes within a quoted selector value. A bare quote is invalid.
fn unescape(value: &str) -> Option<String> {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => unescaped.push(chars.next()?),
            '"' => return None,
            c => unescaped.push(c),
        }
    }

    Some(unescaped)
}

/// A [`Host`] backed by an in-memory element tree.
pub struct MemoryHost {
    body: MemoryElement,
    definitions: RefCell<HashMap<String, usize>>,
    styles: RefCell<Vec<String>>,
    location: RefCell<String>,
    standalone: Cell<bool>,
    listeners: RefCell<HashMapList<String, (ListenerId, NavigationCallback)>>,
    next_listener: Cell<usize>,
    tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    console: RefCell<Vec<String>>,
}

impl MemoryHost {
    /// Create an empty page at `location`.
    pub fn new<S>(location: S) -> Rc<Self>
    where
        S: Into<String>,
    {
        Rc::new(Self {
            body: MemoryElement::new("body"),
            definitions: RefCell::new(HashMap::new()),
            styles: RefCell::new(Vec::new()),
            location: RefCell::new(location.into()),
            standalone: Cell::new(false),
            listeners: RefCell::new(HashMapList::new()),
            next_listener: Cell::new(0),
            tasks: RefCell::new(Vec::new()),
            console: RefCell::new(Vec::new()),
        })
    }

    pub fn body(&self) -> &MemoryElement {
        &self.body
    }

    pub fn set_location<S>(&self, location: S)
    where
        S: Into<String>,
    {
        *self.location.borrow_mut() = location.into();
    }

    pub fn set_standalone(&self, standalone: bool) {
        self.standalone.set(standalone);
    }

    /// Every attached element with the provided tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<MemoryElement> {
        let mut found = Vec::new();
        self.body.walk(&mut |element| {
            if element.tag() == tag {
                found.push(element.clone());
            }
        });

        found
    }

    /// Number of times a class was registered for `tag`.
    pub fn definition_count(&self, tag: &str) -> usize {
        self.definitions.borrow().get(tag).copied().unwrap_or(0)
    }

    pub fn styles(&self) -> Vec<String> {
        self.styles.borrow().clone()
    }

    pub fn console(&self) -> Vec<String> {
        self.console.borrow().clone()
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).len()
    }

    /// Broadcast a navigation event to every listener registered for `event`.
    pub fn dispatch(&self, event: &str, detail: &NavigationEvent) {
        // Listeners may unregister themselves, so release the borrow before calling them.
        let callbacks = self
            .listeners
            .borrow()
            .get(event)
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect::<Vec<_>>();

        for callback in callbacks {
            callback(detail);
        }
    }

    /// Run every spawned task to completion, including tasks spawned while running.
    pub fn run_tasks(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
            if tasks.is_empty() {
                break;
            }

            for task in tasks {
                futures::executor::block_on(task);
            }
        }
    }
}

impl Host for MemoryHost {
    type Element = MemoryElement;

    fn query_selector(&self, selector: &str) -> Result<Option<MemoryElement>> {
        let parsed = Selector::parse(selector).ok_or_else(|| AdapterError::InvalidSelector {
            selector: selector.to_string(),
        })?;

        let mut found = None;
        self.body.walk(&mut |element| {
            if found.is_none() && element.matches(&parsed) {
                found = Some(element.clone());
            }
        });

        Ok(found)
    }

    fn is_connected(&self, element: &MemoryElement) -> bool {
        let mut current = Some(element.clone());
        while let Some(element) = current {
            if element == self.body {
                return true;
            }
            current = element.parent();
        }

        false
    }

    fn create_element(&self, tag: &str) -> Result<MemoryElement> {
        Ok(MemoryElement::new(tag))
    }

    fn set_attribute(&self, element: &MemoryElement, name: &str, value: &str) -> Result<()> {
        element.set_attribute(name, value);
        Ok(())
    }

    fn append_to_body(&self, element: &MemoryElement) -> Result<()> {
        self.body.append_child(element);
        Ok(())
    }

    fn remove_element(&self, element: &MemoryElement) {
        element.remove();
    }

    fn is_element_defined(&self, tag: &str) -> bool {
        self.definitions.borrow().contains_key(tag)
    }

    fn define_element(&self, tag: &str) -> Result<()> {
        let mut definitions = self.definitions.borrow_mut();
        let count = definitions.entry(tag.to_string()).or_insert(0);
        *count += 1;

        // Mirror the browser, which refuses to redefine a name.
        if *count > 1 {
            return Err(AdapterError::Dom(format!("`{tag}` has already been defined")));
        }

        Ok(())
    }

    fn inject_style(&self, css: &str) -> Result<()> {
        self.styles.borrow_mut().push(css.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        self.location.borrow().clone()
    }

    fn is_standalone(&self) -> bool {
        self.standalone.get()
    }

    fn listen(&self, event: &str, callback: NavigationCallback) -> Result<ListenerId> {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        self.listeners
            .borrow_mut()
            .insert(event.to_string(), (id, callback));

        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .remove_first(|(listener, _)| *listener == id);
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push(task);
    }

    fn console_log(&self, message: &str) {
        self.console.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connected_only_below_body() {
        let host = MemoryHost::new("http://localhost/");
        let outer = host.create_element("div").unwrap();
        let inner = host.create_element("span").unwrap();
        outer.append_child(&inner);

        assert!(!host.is_connected(&inner));

        host.append_to_body(&outer).unwrap();
        assert!(host.is_connected(&inner));

        outer.remove();
        assert!(!host.is_connected(&inner));
    }

    #[test]
    fn query_by_id_and_tag() {
        let host = MemoryHost::new("http://localhost/");
        let root = host.create_element("main").unwrap();
        root.set_attribute("id", "root");
        host.append_to_body(&root).unwrap();

        assert_eq!(host.query_selector("#root").unwrap(), Some(root.clone()));
        assert_eq!(host.query_selector("main").unwrap(), Some(root));
        assert_eq!(host.query_selector("#missing").unwrap(), None);
        assert!(matches!(
            host.query_selector("div > p"),
            Err(AdapterError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn query_by_attribute() {
        let host = MemoryHost::new("http://localhost/");
        let plain = host.create_element("kinesis-app").unwrap();
        let quoted = host.create_element("kinesis-app").unwrap();
        plain.set_attribute("name", "billing");
        quoted.set_attribute("name", r#"say "hi""#);
        host.append_to_body(&plain).unwrap();
        host.append_to_body(&quoted).unwrap();

        assert_eq!(
            host.query_selector(r#"kinesis-app[name="billing"]"#).unwrap(),
            Some(plain)
        );
        assert_eq!(
            host.query_selector(r#"kinesis-app[name="say \"hi\""]"#).unwrap(),
            Some(quoted)
        );
        assert_eq!(host.query_selector(r#"div[name="billing"]"#).unwrap(), None);
        assert!(host.query_selector(r#"kinesis-app[name=billing]"#).is_err());
    }

    #[test]
    fn redefinition_is_rejected() {
        let host = MemoryHost::new("http://localhost/");

        host.define_element("kinesis-app").unwrap();
        assert!(host.define_element("kinesis-app").is_err());
        assert_eq!(host.definition_count("kinesis-app"), 2);
    }

    #[test]
    fn unlisten_removes_only_that_listener() {
        let host = MemoryHost::new("http://localhost/");
        let calls = Rc::new(Cell::new(0));

        let callback: NavigationCallback = {
            let calls = Rc::clone(&calls);
            Rc::new(move |_: &NavigationEvent| calls.set(calls.get() + 1))
        };
        let first = host.listen("nav", Rc::clone(&callback)).unwrap();
        host.listen("nav", callback).unwrap();
        host.unlisten(first);

        host.dispatch("nav", &NavigationEvent::new("http://localhost/a", "http://localhost/"));

        assert_eq!(calls.get(), 1);
        assert_eq!(host.listener_count("nav"), 1);
    }
}
