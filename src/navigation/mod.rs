//! Keeps the fragment's router in line with the shell's URL.
//!
//! The shell may change the URL without remounting the fragment, broadcasting a navigation event
//! instead. Each mounted instance listens for that event, and replaces its router's route whenever
//! the target differs from what the router has resolved. On mount the router is additionally
//! re-synced against the page location, as a router that outlived a previous mount can hold a
//! stale route.

use std::{cell::RefCell, rc::Rc, rc::Weak};

use url::{Position, Url};

use crate::app::{Application, Router};
use crate::config::ResyncPolicy;
use crate::error::Result;
use crate::host::{Host, ListenerGuard};

/// Detail of the shell's navigation event. Both URLs are origin qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub to: String,
    pub from: String,
}

impl NavigationEvent {
    pub fn new<T, F>(to: T, from: F) -> Self
    where
        T: Into<String>,
        F: Into<String>,
    {
        Self {
            to: to.into(),
            from: from.into(),
        }
    }
}

/// Strip the scheme, host and port from `url`, leaving the path, query and fragment. Anything that
/// can't be parsed as an absolute URL is assumed to already be a path.
pub fn strip_origin(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed[Position::BeforePath..].to_string(),
        _ => url.to_string(),
    }
}

/// Bring `router` in line with the target of `event`. Returns whether a navigation was issued, which
/// only happens if the router isn't already at the target, so that the router's own navigations
/// are not fought.
pub fn reconcile(router: &dyn Router, event: &NavigationEvent) -> bool {
    let target = strip_origin(&event.to);

    if router.current_path().as_deref() == Some(target.as_str()) {
        tracing::trace!(%target, "router already at navigation target");
        return false;
    }

    tracing::debug!(%target, from = %event.from, "replacing fragment route");
    router.replace(&target);

    true
}

/// Re-derive the router's route from the page `location` after a mount.
pub fn resync(router: Rc<dyn Router>, location: &str, policy: ResyncPolicy) {
    let path = strip_origin(location);

    match policy {
        ResyncPolicy::Force => {
            tracing::debug!(%path, "forcing route resolution");
            router.resolve(&path);
        }
        ResyncPolicy::WhenUnmatched => {
            let ready_router = Rc::clone(&router);
            router.when_ready(Box::new(move || {
                if ready_router.current_path().is_none() {
                    tracing::debug!(%path, "no route matched after ready, resolving");
                    ready_router.resolve(&path);
                }
            }));
        }
    }
}

/// Register the navigation listener for a mounted instance. The listener only holds a weak
/// reference to the instance, and is removed when the returned guard is dropped.
pub fn listen<A, H>(
    host: &Rc<H>,
    instance: &Rc<RefCell<A>>,
    event: &str,
) -> Result<ListenerGuard<H>>
where
    A: Application<H::Element> + 'static,
    H: Host,
{
    let instance: Weak<RefCell<A>> = Rc::downgrade(instance);

    ListenerGuard::listen(
        host,
        event,
        Rc::new(move |event: &NavigationEvent| {
            let Some(instance) = instance.upgrade() else { return };

            // Release the instance before navigating, the router may call back into it.
            let router = instance.borrow().globals().router();
            let Some(router) = router else {
                tracing::trace!("navigation event ignored, no router published");
                return;
            };

            reconcile(&*router, event);
        }),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Router that records every navigation.
    #[derive(Default)]
    struct Recorder {
        current: RefCell<Option<String>>,
        replaced: RefCell<Vec<String>>,
        resolved: RefCell<Vec<String>>,
        deferred: RefCell<Option<Box<dyn FnOnce()>>>,
        defer_ready: Cell<bool>,
    }

    impl Recorder {
        fn at(path: &str) -> Rc<Self> {
            let router = Rc::new(Self::default());
            *router.current.borrow_mut() = Some(path.to_string());
            router
        }
    }

    impl Router for Recorder {
        fn current_path(&self) -> Option<String> {
            self.current.borrow().clone()
        }

        fn replace(&self, path: &str) {
            self.replaced.borrow_mut().push(path.to_string());
            *self.current.borrow_mut() = Some(path.to_string());
        }

        fn resolve(&self, path: &str) {
            self.resolved.borrow_mut().push(path.to_string());
            *self.current.borrow_mut() = Some(path.to_string());
        }

        fn when_ready(&self, callback: Box<dyn FnOnce()>) {
            if self.defer_ready.get() {
                *self.deferred.borrow_mut() = Some(callback);
            } else {
                callback();
            }
        }
    }

    #[test]
    fn strips_origin() {
        assert_eq!(
            strip_origin("https://shell.example:8080/billing/invoices?page=2#top"),
            "/billing/invoices?page=2#top"
        );
        assert_eq!(strip_origin("http://localhost"), "/");
        assert_eq!(strip_origin("/already/a/path"), "/already/a/path");
    }

    #[test]
    fn matching_path_is_not_navigated() {
        let router = Recorder::at("/billing");

        let navigated = reconcile(
            &*router,
            &NavigationEvent::new("http://localhost/billing", "http://localhost/"),
        );

        assert!(!navigated);
        assert!(router.replaced.borrow().is_empty());
    }

    #[test]
    fn differing_path_is_replaced_once() {
        let router = Recorder::at("/billing");

        let navigated = reconcile(
            &*router,
            &NavigationEvent::new("http://localhost/billing/2?x=1", "http://localhost/billing"),
        );

        assert!(navigated);
        assert_eq!(*router.replaced.borrow(), vec!["/billing/2?x=1".to_string()]);
    }

    #[test]
    fn force_always_resolves() {
        let router = Recorder::at("/stale");

        resync(router.clone(), "http://localhost/fresh", ResyncPolicy::Force);

        assert_eq!(*router.resolved.borrow(), vec!["/fresh".to_string()]);
    }

    #[test]
    fn when_unmatched_leaves_matched_route() {
        let router = Recorder::at("/matched");

        resync(router.clone(), "http://localhost/other", ResyncPolicy::WhenUnmatched);

        assert!(router.resolved.borrow().is_empty());
    }

    #[test]
    fn when_unmatched_waits_for_ready() {
        let router = Rc::new(Recorder::default());
        router.defer_ready.set(true);

        resync(router.clone(), "http://localhost/orders", ResyncPolicy::WhenUnmatched);
        assert!(router.resolved.borrow().is_empty());

        let ready = router.deferred.borrow_mut().take().unwrap();
        ready();

        assert_eq!(*router.resolved.borrow(), vec!["/orders".to_string()]);
    }
}
