use std::future::Future;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::app::{InstanceHandle, MountProps};

/// Result of a customization hook, always deferred.
pub type HookFuture = LocalBoxFuture<'static, anyhow::Result<()>>;

type HookFn<A, E> = dyn Fn(InstanceHandle<A>, &MountProps<E>) -> HookFuture;

/// Caller supplied customization of a freshly created instance, run before it is attached. A hook
/// always produces a deferred result, and the lifecycle always awaits it, whether the work behind
/// it is synchronous or not.
pub struct Hook<A, E>(Box<HookFn<A, E>>);

impl<A, E> Hook<A, E>
where
    A: 'static,
    E: 'static,
{
    /// Wrap an asynchronous hook. The returned future must not borrow the props; copy what is
    /// needed out of them before it is created.
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(InstanceHandle<A>, &MountProps<E>) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self(Box::new(
            move |instance: InstanceHandle<A>, props: &MountProps<E>| {
                hook(instance, props).boxed_local()
            },
        ))
    }

    /// Wrap a hook that completes immediately.
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(&mut A, &MountProps<E>) -> anyhow::Result<()> + 'static,
    {
        Self(Box::new(move |instance: InstanceHandle<A>, props: &MountProps<E>| {
            let result = hook(&mut instance.borrow_mut(), props);
            future::ready(result).boxed_local()
        }))
    }

    pub(crate) fn call(&self, instance: InstanceHandle<A>, props: &MountProps<E>) -> HookFuture {
        (self.0)(instance, props)
    }
}
