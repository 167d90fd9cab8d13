use std::{cell::RefCell, fmt, rc::Rc};

use crate::app::InstanceHandle;
use crate::error::{AdapterError, Result};
use crate::host::{Host, ListenerGuard};
use crate::target::MountTarget;

/// Observable state of a [`super::Lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    Mounting,
    Mounted,
    Unmounting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unmounted => "unmounted",
            Self::Mounting => "mounting",
            Self::Mounted => "mounted",
            Self::Unmounting => "unmounting",
        })
    }
}

/// Everything owned by a live mount. Dropping it releases the navigation listener and removes a
/// synthesized target.
pub(crate) struct Mounted<A, H>
where
    H: Host,
{
    pub instance: InstanceHandle<A>,
    pub target: MountTarget<H>,
    pub listener: ListenerGuard<H>,
}

enum Phase<A, H>
where
    H: Host,
{
    Unmounted,
    Mounting,
    Mounted(Mounted<A, H>),
    Unmounting,
}

impl<A, H> Phase<A, H>
where
    H: Host,
{
    fn state(&self) -> LifecycleState {
        match self {
            Phase::Unmounted => LifecycleState::Unmounted,
            Phase::Mounting => LifecycleState::Mounting,
            Phase::Mounted(_) => LifecycleState::Mounted,
            Phase::Unmounting => LifecycleState::Unmounting,
        }
    }
}

/// The single slot holding the active application instance. All transitions between lifecycle
/// states go through here, so an illegal transition is rejected rather than overwriting the
/// instance.
pub(crate) struct InstanceSlot<A, H>(Rc<RefCell<Phase<A, H>>>)
where
    H: Host;

impl<A, H> InstanceSlot<A, H>
where
    H: Host,
{
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Phase::Unmounted)))
    }

    pub fn state(&self) -> LifecycleState {
        self.0.borrow().state()
    }

    /// The mounted instance, if there is one.
    pub fn instance(&self) -> Option<InstanceHandle<A>> {
        match &*self.0.borrow() {
            Phase::Mounted(mounted) => Some(Rc::clone(&mounted.instance)),
            _ => None,
        }
    }

    /// The element the mounted instance is attached within.
    pub fn target(&self) -> Option<H::Element> {
        match &*self.0.borrow() {
            Phase::Mounted(mounted) => Some(mounted.target.element().clone()),
            _ => None,
        }
    }

    /// Move from `Unmounted` to `Mounting`. The slot falls back to `Unmounted` when the returned
    /// guard is dropped without being committed.
    pub fn begin_mount(&self) -> Result<MountGuard<A, H>> {
        let mut phase = self.0.borrow_mut();

        let state = phase.state();
        if state != LifecycleState::Unmounted {
            return Err(AdapterError::InvalidTransition {
                operation: "mount",
                state,
            });
        }

        *phase = Phase::Mounting;

        Ok(MountGuard {
            slot: self.clone(),
            committed: false,
        })
    }

    /// Move from `Mounted` to `Unmounting`, handing out the mount so it can be torn down. Returns
    /// [`None`] when nothing is mounted.
    pub fn begin_unmount(&self) -> Result<Option<Mounted<A, H>>> {
        let mut phase = self.0.borrow_mut();

        match std::mem::replace(&mut *phase, Phase::Unmounting) {
            Phase::Mounted(mounted) => Ok(Some(mounted)),
            Phase::Unmounted => {
                *phase = Phase::Unmounted;
                Ok(None)
            }
            other => {
                let state = other.state();
                *phase = other;

                Err(AdapterError::InvalidTransition {
                    operation: "unmount",
                    state,
                })
            }
        }
    }

    pub fn finish_unmount(&self) {
        *self.0.borrow_mut() = Phase::Unmounted;
    }
}

impl<A, H> Clone for InstanceSlot<A, H>
where
    H: Host,
{
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

/// An in-flight mount. Either committed with the finished mount, or dropped (on failure or
/// cancellation), which returns the slot to `Unmounted`.
#[must_use = "dropping the guard abandons the mount"]
pub(crate) struct MountGuard<A, H>
where
    H: Host,
{
    slot: InstanceSlot<A, H>,
    committed: bool,
}

impl<A, H> MountGuard<A, H>
where
    H: Host,
{
    pub fn commit(mut self, mounted: Mounted<A, H>) {
        *self.slot.0.borrow_mut() = Phase::Mounted(mounted);
        self.committed = true;
    }
}

impl<A, H> Drop for MountGuard<A, H>
where
    H: Host,
{
    fn drop(&mut self) {
        if !self.committed {
            *self.slot.0.borrow_mut() = Phase::Unmounted;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::MountProps;
    use crate::config::AdapterConfig;
    use crate::host::memory::MemoryHost;
    use crate::navigation::NavigationEvent;
    use crate::target;

    type Slot = InstanceSlot<u32, MemoryHost>;

    fn mounted(host: &Rc<MemoryHost>, value: u32) -> Mounted<u32, MemoryHost> {
        Mounted {
            instance: Rc::new(RefCell::new(value)),
            target: target::resolve(host, &MountProps::new(), None, &AdapterConfig::default())
                .unwrap(),
            listener: ListenerGuard::listen(host, "nav", Rc::new(|_: &NavigationEvent| {})).unwrap(),
        }
    }

    #[test]
    fn abandoned_mount_returns_to_unmounted() {
        let slot = Slot::new();

        let guard = slot.begin_mount().unwrap();
        assert_eq!(slot.state(), LifecycleState::Mounting);

        drop(guard);
        assert_eq!(slot.state(), LifecycleState::Unmounted);
        assert!(slot.instance().is_none());
    }

    #[test]
    fn second_mount_is_rejected() {
        let host = MemoryHost::new("http://localhost/");
        let slot = Slot::new();

        let guard = slot.begin_mount().unwrap();
        assert!(matches!(
            slot.begin_mount(),
            Err(AdapterError::InvalidTransition {
                state: LifecycleState::Mounting,
                ..
            })
        ));

        guard.commit(mounted(&host, 1));
        assert!(matches!(
            slot.begin_mount(),
            Err(AdapterError::InvalidTransition {
                state: LifecycleState::Mounted,
                ..
            })
        ));
        assert_eq!(slot.instance().map(|i| *i.borrow()), Some(1));
        assert_eq!(slot.target().map(|t| t.tag().to_string()).as_deref(), Some("kinesis-app"));
    }

    #[test]
    fn unmount_hands_out_mount_once() {
        let host = MemoryHost::new("http://localhost/");
        let slot = Slot::new();
        slot.begin_mount().unwrap().commit(mounted(&host, 7));

        let taken = slot.begin_unmount().unwrap();
        assert!(taken.is_some());
        assert_eq!(slot.state(), LifecycleState::Unmounting);
        assert!(matches!(
            slot.begin_unmount(),
            Err(AdapterError::InvalidTransition { .. })
        ));

        drop(taken);
        slot.finish_unmount();
        assert_eq!(host.listener_count("nav"), 0);
        assert!(host.body().children().is_empty());
        assert!(slot.begin_unmount().unwrap().is_none());
    }
}
