pub mod element;

use std::{fmt, rc::Rc};

use crate::app::MountProps;
use crate::config::AdapterConfig;
use crate::error::{AdapterError, Result};
use crate::host::Host;

/// Where the adapter was configured to mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountTargetOption<E> {
    /// A selector, queried afresh on every mount.
    Selector(String),

    /// A concrete element.
    Element(E),
}

impl<E> From<&str> for MountTargetOption<E> {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl<E> From<String> for MountTargetOption<E> {
    fn from(selector: String) -> Self {
        Self::Selector(selector)
    }
}

/// The element a mount attaches within. A container synthesized for the mount belongs to it, and is
/// removed from the document again when the target is dropped, whether the mount failed part way or
/// was later unmounted.
pub struct MountTarget<H>
where
    H: Host,
{
    host: Rc<H>,
    element: H::Element,
    synthesized: bool,
}

impl<H> MountTarget<H>
where
    H: Host,
{
    fn existing(host: &Rc<H>, element: H::Element) -> Self {
        Self {
            host: Rc::clone(host),
            element,
            synthesized: false,
        }
    }

    pub fn element(&self) -> &H::Element {
        &self.element
    }

    /// Whether the element was created for this mount.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }
}

impl<H> Drop for MountTarget<H>
where
    H: Host,
{
    fn drop(&mut self) {
        if self.synthesized {
            self.host.remove_element(&self.element);
            tracing::debug!("removed synthesized mount target");
        }
    }
}

impl<H> fmt::Debug for MountTarget<H>
where
    H: Host,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountTarget")
            .field("synthesized", &self.synthesized)
            .finish_non_exhaustive()
    }
}

/// Decide which element a mount attaches to. Evaluated once per mount, in order:
///
/// 1. An element supplied in `props`, if it is attached to the document.
/// 2. The configured selector. If nothing matches, this fails with
///    [`AdapterError::TargetNotFound`] rather than falling back, since the embedding page is
///    expected to provide the element.
/// 3. The configured element.
/// 4. The container named after the fragment. An attached container with that name is reused,
///    otherwise one is synthesized and appended to the body.
pub fn resolve<H>(
    host: &Rc<H>,
    props: &MountProps<H::Element>,
    configured: Option<&MountTargetOption<H::Element>>,
    config: &AdapterConfig,
) -> Result<MountTarget<H>>
where
    H: Host,
{
    if let Some(element) = props
        .element
        .as_ref()
        .filter(|element| host.is_connected(element))
    {
        tracing::debug!("mounting within element supplied by props");
        return Ok(MountTarget::existing(host, element.clone()));
    }

    match configured {
        Some(MountTargetOption::Selector(selector)) => {
            tracing::debug!(%selector, "mounting within configured selector");
            let element = host.query_selector(selector)?.ok_or_else(|| {
                AdapterError::TargetNotFound {
                    selector: selector.clone(),
                }
            })?;

            Ok(MountTarget::existing(host, element))
        }
        Some(MountTargetOption::Element(element)) => {
            tracing::debug!("mounting within configured element");
            Ok(MountTarget::existing(host, element.clone()))
        }
        None => container(host, props, config),
    }
}

/// Selector matching a container with the provided `name`.
fn named_selector(tag: &str, name: &str) -> String {
    let name = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{tag}[name=\"{name}\"]")
}

/// Find or create the container element tagged with the fragment's name.
fn container<H>(
    host: &Rc<H>,
    props: &MountProps<H::Element>,
    config: &AdapterConfig,
) -> Result<MountTarget<H>>
where
    H: Host,
{
    element::ensure_defined(&**host, &config.tag)?;

    let name = props.name.as_deref().unwrap_or(&config.fallback_name);

    if let Some(existing) = host.query_selector(&named_selector(&config.tag, name))? {
        tracing::debug!(tag = %config.tag, %name, "reusing mount target");
        return Ok(MountTarget::existing(host, existing));
    }

    let container = host.create_element(&config.tag)?;
    host.set_attribute(&container, "name", name)?;
    host.append_to_body(&container)?;

    tracing::debug!(tag = %config.tag, %name, "synthesized mount target");

    Ok(MountTarget {
        host: Rc::clone(host),
        element: container,
        synthesized: true,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::host::memory::{MemoryElement, MemoryHost};

    fn root(host: &MemoryHost) -> MemoryElement {
        let root = host.create_element("div").unwrap();
        root.set_attribute("id", "root");
        host.append_to_body(&root).unwrap();
        root
    }

    #[test]
    fn attached_prop_element_wins() {
        let host = MemoryHost::new("http://localhost/");
        let configured = root(&host);
        let supplied = host.create_element("section").unwrap();
        host.append_to_body(&supplied).unwrap();

        let target = resolve(
            &host,
            &MountProps::new().with_element(supplied.clone()),
            Some(&MountTargetOption::Element(configured)),
            &AdapterConfig::default(),
        )
        .unwrap();

        assert_eq!(*target.element(), supplied);
        assert!(!target.is_synthesized());
    }

    #[test]
    fn detached_prop_element_is_ignored() {
        let host = MemoryHost::new("http://localhost/");
        let configured = root(&host);
        let detached = host.create_element("section").unwrap();

        let target = resolve(
            &host,
            &MountProps::new().with_element(detached),
            Some(&"#root".into()),
            &AdapterConfig::default(),
        )
        .unwrap();

        assert_eq!(*target.element(), configured);

        drop(target);
        assert!(host.is_connected(&configured));
    }

    #[test]
    fn missing_selector_fails() {
        let host = MemoryHost::new("http://localhost/");

        let err = resolve(
            &host,
            &MountProps::new(),
            Some(&"#missing".into()),
            &AdapterConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, AdapterError::TargetNotFound { selector } if selector == "#missing"));
        assert!(host.body().children().is_empty());
    }

    #[test]
    fn synthesized_container_uses_fallback_name() {
        let host = MemoryHost::new("http://localhost/");
        let config = AdapterConfig::default();

        let target = resolve(&host, &MountProps::new(), None, &config).unwrap();

        assert!(target.is_synthesized());
        assert_eq!(target.element().tag(), config.tag);
        assert_eq!(
            target.element().attribute("name"),
            Some(config.fallback_name.clone())
        );
        assert_eq!(target.element().parent().as_ref(), Some(host.body()));
    }

    #[test]
    fn dropping_target_removes_synthesized_container() {
        let host = MemoryHost::new("http://localhost/");
        let config = AdapterConfig::default();

        let target = resolve(&host, &MountProps::new().with_name("a"), None, &config).unwrap();
        let element = target.element().clone();
        drop(target);

        assert!(!host.is_connected(&element));
        assert!(host.elements_by_tag(&config.tag).is_empty());
    }

    #[test]
    fn named_container_is_reused() {
        let host = MemoryHost::new("http://localhost/");
        let config = AdapterConfig::default();

        let first = resolve(&host, &MountProps::new().with_name("a"), None, &config).unwrap();
        let reused = resolve(&host, &MountProps::new().with_name("a"), None, &config).unwrap();
        let other = resolve(&host, &MountProps::new().with_name("b"), None, &config).unwrap();

        assert_eq!(reused.element(), first.element());
        assert!(!reused.is_synthesized());
        assert!(other.is_synthesized());

        let names = host
            .elements_by_tag(&config.tag)
            .iter()
            .map(|element| element.attribute("name").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(host.definition_count(&config.tag), 1);
    }

    #[test]
    fn name_is_escaped_in_selector() {
        assert_eq!(
            named_selector("kinesis-app", r#"a"b\c"#),
            r#"kinesis-app[name="a\"b\\c"]"#
        );
    }
}
