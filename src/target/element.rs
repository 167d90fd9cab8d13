use crate::error::Result;
use crate::host::Host;

/// Body of the class registered for the container element. A plain element with no behaviour of its
/// own; it only exists to give the fragment a uniquely named root.
pub const ELEMENT_CLASS: &str = "return class extends HTMLElement {}";

/// Style rule injected alongside the definition. Custom elements are inline by default.
pub fn style_rule(tag: &str) -> String {
    format!("{tag} {{ display: block; }}")
}

/// Register the container element for `tag` unless the page already knows it, injecting its style
/// rule the first time. Returns whether this call performed the registration.
pub fn ensure_defined<H>(host: &H, tag: &str) -> Result<bool>
where
    H: Host + ?Sized,
{
    if host.is_element_defined(tag) {
        return Ok(false);
    }

    host.define_element(tag)?;
    host.inject_style(&style_rule(tag))?;

    tracing::debug!(tag, "registered container element");

    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::host::memory::MemoryHost;

    #[test]
    fn registers_once() {
        let host = MemoryHost::new("http://localhost/");

        assert!(ensure_defined(&*host, "kinesis-app").unwrap());
        assert!(!ensure_defined(&*host, "kinesis-app").unwrap());

        assert_eq!(host.definition_count("kinesis-app"), 1);
        assert_eq!(host.styles(), vec!["kinesis-app { display: block; }".to_string()]);
    }

    #[test]
    fn tags_are_independent() {
        let host = MemoryHost::new("http://localhost/");

        ensure_defined(&*host, "billing-app").unwrap();
        ensure_defined(&*host, "orders-app").unwrap();

        assert_eq!(host.definition_count("billing-app"), 1);
        assert_eq!(host.definition_count("orders-app"), 1);
        assert_eq!(host.styles().len(), 2);
    }
}
