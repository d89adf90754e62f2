//! Interface to the remote Linked Data Platform store.

use crate::error::TransportError;
use crate::graph::TripleStore;
use crate::vocab::solid;
use async_trait::async_trait;
use oxrdf::Triple;
use std::fmt::{self, Write};

/// Kind of an LDP resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A single addressable set of triples.
    Document,
    /// A collection of child documents listed with `ldp:contains`.
    Container,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Document => "document",
            Self::Container => "container",
        })
    }
}

/// A set of triples to delete and a set of triples to insert, applied atomically.
///
/// ```
/// use oxrdf::{Literal, NamedNodeRef, Triple};
/// use shapeql::Patch;
///
/// let s = NamedNodeRef::new_unchecked("http://example.org/s");
/// let p = NamedNodeRef::new_unchecked("http://example.org/p");
/// let mut patch = Patch::default();
/// patch.insert(Triple::new(s, p, Literal::new_simple_literal("new")));
/// assert!(patch.to_n3().contains(
///     "<http://www.w3.org/ns/solid/terms#inserts> { <http://example.org/s> <http://example.org/p> \"new\" . }"
/// ));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub inserts: Vec<Triple>,
    pub deletes: Vec<Triple>,
}

impl Patch {
    /// Media type of the serialized patch document.
    pub const CONTENT_TYPE: &'static str = "text/n3";

    pub fn new(inserts: Vec<Triple>, deletes: Vec<Triple>) -> Self {
        Self { inserts, deletes }
    }

    pub fn insert(&mut self, triple: Triple) -> &mut Self {
        if !self.inserts.contains(&triple) {
            self.inserts.push(triple);
        }
        self
    }

    pub fn delete(&mut self, triple: Triple) -> &mut Self {
        if !self.deletes.contains(&triple) {
            self.deletes.push(triple);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    /// Serializes the patch as a Solid N3 Patch document.
    pub fn to_n3(&self) -> String {
        let mut n3 = format!("_:patch a {}", solid::INSERT_DELETE_PATCH);
        for (predicate, triples) in [
            (solid::INSERTS, &self.inserts),
            (solid::DELETES, &self.deletes),
        ] {
            if triples.is_empty() {
                continue;
            }
            let _ = write!(n3, ";\n  {predicate} {{");
            for triple in triples {
                let _ = write!(n3, " {triple} .");
            }
            n3.push_str(" }");
        }
        n3.push_str(".\n");
        n3
    }
}

/// Access to an LDP resource store.
///
/// Authentication and retry policies are up to the implementation.
#[async_trait]
pub trait LdpClient: Send + Sync {
    /// Tells if the resource at `url` is a container or a document.
    async fn fetch_resource_kind(&self, url: &str) -> Result<ResourceKind, TransportError>;

    /// Downloads the triples of the resource at `url`.
    async fn download_graph(&self, url: &str) -> Result<TripleStore, TransportError>;

    /// Applies `patch` to the resource at `url`.
    async fn patch(&self, url: &str, patch: &Patch) -> Result<(), TransportError>;

    /// Creates or replaces the resource at `url`.
    async fn put(&self, url: &str, graph: &TripleStore) -> Result<(), TransportError>;

    /// Deletes the resource at `url`.
    async fn delete(&self, url: &str) -> Result<(), TransportError>;
}

/// Returns the URL of the document holding `iri`, i.e. `iri` without its fragment.
pub fn document_url(iri: &str) -> &str {
    iri.split_once('#').map_or(iri, |(document, _)| document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{Literal, NamedNode};

    #[test]
    fn test_patch_document() {
        let s = NamedNode::new("http://example.org/doc#me").unwrap();
        let p = NamedNode::new("http://schema.org/givenName").unwrap();
        let mut patch = Patch::default();
        patch
            .delete(Triple::new(s.clone(), p.clone(), Literal::new_simple_literal("Thomas")))
            .insert(Triple::new(s.clone(), p.clone(), Literal::new_simple_literal("Dupont")))
            .insert(Triple::new(s, p, Literal::new_simple_literal("Dupont")));
        assert_eq!(patch.inserts.len(), 1);
        assert_eq!(
            patch.to_n3(),
            "_:patch a <http://www.w3.org/ns/solid/terms#InsertDeletePatch>;\n  \
             <http://www.w3.org/ns/solid/terms#inserts> { <http://example.org/doc#me> <http://schema.org/givenName> \"Dupont\" . };\n  \
             <http://www.w3.org/ns/solid/terms#deletes> { <http://example.org/doc#me> <http://schema.org/givenName> \"Thomas\" . }.\n"
        );
    }

    #[test]
    fn test_empty_patch() {
        let patch = Patch::default();
        assert!(patch.is_empty());
        assert_eq!(
            patch.to_n3(),
            "_:patch a <http://www.w3.org/ns/solid/terms#InsertDeletePatch>.\n"
        );
    }

    #[test]
    fn test_document_url() {
        assert_eq!(
            document_url("http://example.org/cont/tdupont#me"),
            "http://example.org/cont/tdupont"
        );
        assert_eq!(document_url("http://example.org/cont/"), "http://example.org/cont/");
    }
}
