//! Mapping from classes to the resources holding their instances.

use oxrdf::{NamedNode, NamedNodeRef};
use rustc_hash::FxHashMap;

/// Returns the URL of the resource (container or document) holding the instances of a class.
pub trait TargetResolver: Send + Sync {
    fn resolve(&self, class: NamedNodeRef<'_>) -> Option<String>;
}

impl<F: Fn(NamedNodeRef<'_>) -> Option<String> + Send + Sync> TargetResolver for F {
    fn resolve(&self, class: NamedNodeRef<'_>) -> Option<String> {
        self(class)
    }
}

/// A [`TargetResolver`] backed by a fixed table, with an optional fallback URL.
///
/// ```
/// use oxrdf::NamedNodeRef;
/// use shapeql::{StaticTargetResolver, TargetResolver};
///
/// let person = NamedNodeRef::new_unchecked("http://schema.org/Person");
/// let resolver = StaticTargetResolver::new()
///     .with_target(person, "http://example.org/cont/")
///     .with_default("http://example.org/misc");
/// assert_eq!(resolver.resolve(person).as_deref(), Some("http://example.org/cont/"));
/// assert_eq!(
///     resolver.resolve(NamedNodeRef::new_unchecked("http://schema.org/Thing")).as_deref(),
///     Some("http://example.org/misc")
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTargetResolver {
    targets: FxHashMap<NamedNode, String>,
    default: Option<String>,
}

impl StaticTargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_target(mut self, class: impl Into<NamedNode>, url: impl Into<String>) -> Self {
        self.targets.insert(class.into(), url.into());
        self
    }

    /// Sets the URL returned for classes without explicit target.
    #[must_use]
    pub fn with_default(mut self, url: impl Into<String>) -> Self {
        self.default = Some(url.into());
        self
    }
}

impl TargetResolver for StaticTargetResolver {
    fn resolve(&self, class: NamedNodeRef<'_>) -> Option<String> {
        self.targets
            .get(&class.into_owned())
            .or(self.default.as_ref())
            .cloned()
    }
}
