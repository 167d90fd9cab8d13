mod hook;
mod slot;

pub use self::hook::{Hook, HookFuture};
pub use self::slot::LifecycleState;

use std::{cell::RefCell, marker::PhantomData, rc::Rc};

use self::slot::{InstanceSlot, Mounted};
use crate::app::{Application, InstanceHandle, MountProps, RootFn};
use crate::config::AdapterConfig;
use crate::error::{AdapterError, Result};
use crate::host::Host;
use crate::navigation;
use crate::target::{self, MountTargetOption};

/// Lifecycle controller for a single fragment, exposing the `bootstrap`/`mount`/`update`/`unmount`
/// contract expected by the shell.
///
/// Owns the only long-lived reference to the application instance. At most one instance is alive
/// at a time: a `mount` is only accepted while unmounted, and the instance is released again by
/// `unmount`.
pub struct Lifecycle<A, H>
where
    H: Host,
{
    /// The page the fragment is mounted into.
    host: Rc<H>,

    /// Creates a fresh application instance for every mount.
    root: Box<RootFn<A, H::Element>>,

    /// Explicitly configured mount target. Takes precedence over the selector in `config`.
    el: Option<MountTargetOption<H::Element>>,

    hook: Option<Hook<A, H::Element>>,

    config: AdapterConfig,

    slot: InstanceSlot<A, H>,
}

impl<A, H> Lifecycle<A, H>
where
    A: Application<H::Element> + 'static,
    H: Host,
{
    /// Start building a lifecycle for a fragment mounted into `host`.
    pub fn builder(host: &Rc<H>) -> LifecycleBuilder<A, H> {
        LifecycleBuilder {
            host: Rc::clone(host),
            root: None,
            el: None,
            hook: None,
            config: AdapterConfig::default(),
        }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.slot.state()
    }

    /// The currently mounted instance.
    pub fn instance(&self) -> Option<InstanceHandle<A>> {
        self.slot.instance()
    }

    /// The element the current instance is attached within.
    pub fn target(&self) -> Option<H::Element> {
        self.slot.target()
    }

    /// Nothing needs preparing ahead of the first mount. Always succeeds.
    pub async fn bootstrap(&self) -> Result<()> {
        tracing::trace!("bootstrap");
        Ok(())
    }

    /// Mount the fragment.
    ///
    /// Resolves the mount target, creates the application instance, runs the customization hook,
    /// attaches the instance to the target, and finally starts synchronising navigation. If any
    /// step fails (or the returned future is dropped part way) nothing is stored, a started
    /// attachment is detached again, a synthesized target is removed, and the lifecycle is left
    /// unmounted.
    pub async fn mount(&self, props: &MountProps<H::Element>) -> Result<InstanceHandle<A>> {
        let guard = self.slot.begin_mount()?;

        tracing::debug!(name = ?props.name, "mounting fragment");

        let target = target::resolve(&self.host, props, self.el.as_ref(), &self.config)?;

        let instance = Rc::new(RefCell::new((self.root)(props)));

        if let Some(hook) = &self.hook {
            hook.call(Rc::clone(&instance), props)
                .await
                .map_err(AdapterError::Hook)?;
        }

        let attachment = Attachment::<A, H::Element>::new(&instance);
        let attached = instance.borrow_mut().attach(target.element());
        attached.await?;

        let listener = navigation::listen(&self.host, &instance, &self.config.navigation_event)?;

        // Release the instance before resyncing, the router may call back into it.
        let router = instance.borrow().globals().router();
        if let Some(router) = router {
            navigation::resync(router, &self.host.location(), self.config.resync);
        }

        attachment.complete();
        guard.commit(Mounted {
            instance: Rc::clone(&instance),
            target,
            listener,
        });

        tracing::debug!("fragment mounted");

        Ok(instance)
    }

    /// Merge the props' data into the instance's global properties. Does nothing if no instance
    /// is mounted.
    pub fn update(&self, props: &MountProps<H::Element>) -> Result<()> {
        match self.slot.instance() {
            Some(instance) => {
                instance.borrow_mut().globals_mut().merge(&props.data);
                tracing::debug!(keys = props.data.len(), "updated fragment");
            }
            None => tracing::trace!("update ignored, nothing mounted"),
        }

        Ok(())
    }

    /// Stop synchronising navigation, detach the instance and release it. Does nothing if no
    /// instance is mounted.
    pub fn unmount(&self) -> Result<()> {
        let Some(Mounted {
            instance,
            target,
            listener,
        }) = self.slot.begin_unmount()?
        else {
            tracing::trace!("unmount ignored, nothing mounted");
            return Ok(());
        };

        drop(listener);
        instance.borrow_mut().detach();
        drop(target);

        self.slot.finish_unmount();

        tracing::debug!("fragment unmounted");

        Ok(())
    }

    /// Mount with no props on the host's event loop, reporting the outcome to the console.
    fn mount_standalone(self: &Rc<Self>) {
        let lifecycle = Rc::clone(self);

        self.host.spawn(Box::pin(async move {
            match lifecycle.mount(&MountProps::default()).await {
                Ok(_) => lifecycle.host.console_log("fragment mounted standalone"),
                Err(err) => lifecycle
                    .host
                    .console_log(&format!("standalone mount failed: {err}")),
            }
        }));
    }
}

/// An attachment that has been started but not yet completed. Detaches the instance when dropped
/// before [`Attachment::complete()`].
struct Attachment<A, E>
where
    A: Application<E>,
{
    instance: Option<InstanceHandle<A>>,
    target: PhantomData<fn(&E)>,
}

impl<A, E> Attachment<A, E>
where
    A: Application<E>,
{
    fn new(instance: &InstanceHandle<A>) -> Self {
        Self {
            instance: Some(Rc::clone(instance)),
            target: PhantomData,
        }
    }

    fn complete(mut self) {
        self.instance = None;
    }
}

impl<A, E> Drop for Attachment<A, E>
where
    A: Application<E>,
{
    fn drop(&mut self) {
        let Some(instance) = self.instance.take() else { return };

        match instance.try_borrow_mut() {
            Ok(mut app) => {
                app.detach();
                tracing::debug!("detached incomplete mount");
            }
            Err(_) => tracing::warn!("incomplete mount left attached, instance is in use"),
        };
    }
}

/// Builder for a [`Lifecycle`].
pub struct LifecycleBuilder<A, H>
where
    H: Host,
{
    host: Rc<H>,
    root: Option<Box<RootFn<A, H::Element>>>,
    el: Option<MountTargetOption<H::Element>>,
    hook: Option<Hook<A, H::Element>>,
    config: AdapterConfig,
}

impl<A, H> LifecycleBuilder<A, H>
where
    A: Application<H::Element> + 'static,
    H: Host,
{
    /// Set the root definition, used to create the application instance on every mount.
    pub fn root<F>(mut self, root: F) -> Self
    where
        F: Fn(&MountProps<H::Element>) -> A + 'static,
    {
        self.root = Some(Box::new(root));
        self
    }

    /// Set the mount target, as either a selector or an element.
    pub fn el<T>(mut self, el: T) -> Self
    where
        T: Into<MountTargetOption<H::Element>>,
    {
        self.el = Some(el.into());
        self
    }

    pub fn customize(mut self, hook: Hook<A, H::Element>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish construction. If the host reports that the fragment is running without a shell,
    /// a mount is started straight away.
    pub fn build(self) -> Result<Rc<Lifecycle<A, H>>> {
        self.config.validate()?;

        let root = self.root.ok_or(AdapterError::MissingOption("root"))?;
        let el = self
            .el
            .or_else(|| self.config.el.clone().map(MountTargetOption::Selector));

        let lifecycle = Rc::new(Lifecycle {
            host: self.host,
            root,
            el,
            hook: self.hook,
            config: self.config,
            slot: InstanceSlot::new(),
        });

        if lifecycle.host.is_standalone() {
            tracing::debug!("no shell present, mounting standalone");
            lifecycle.mount_standalone();
        }

        Ok(lifecycle)
    }
}
