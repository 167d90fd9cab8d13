//! Lifecycle adapter that lets a shell mount, update and unmount a fragment without knowing
//! anything about its internals.
//!
//! A [`Lifecycle`] owns the fragment's application instance. On `mount` it picks the element to
//! mount within (see [`target::resolve()`]), creates the instance, runs an optional customization
//! [`Hook`], attaches the instance, and keeps its router in line with the shell's navigation (see
//! [`navigation`]). The page itself is abstracted behind [`Host`], implemented for the browser by
//! `host::web::WebHost` and in memory by [`host::memory::MemoryHost`].

pub mod app;
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod navigation;
pub mod target;
mod util;

#[cfg(target_arch = "wasm32")]
pub mod bindings;

pub use app::{
    Application, AttachFuture, GlobalProperties, InstanceHandle, MountProps, PropValue, Router,
};
pub use config::{AdapterConfig, ResyncPolicy};
pub use error::{AdapterError, Result};
pub use host::{Host, ListenerGuard};
pub use lifecycle::{Hook, Lifecycle, LifecycleBuilder, LifecycleState};
pub use navigation::NavigationEvent;
pub use target::{MountTarget, MountTargetOption};
