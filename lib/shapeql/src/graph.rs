//! In-memory triple store with pattern lookup and the shared handle threaded through resolution.

use oxrdf::{Graph, NamedNodeRef, SubjectRef, TermRef, Triple, TripleRef};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A queryable set of triples.
///
/// ```
/// use oxrdf::{Literal, NamedNodeRef, Triple};
/// use shapeql::TripleStore;
///
/// let ex = NamedNodeRef::new_unchecked("http://example.org/thomas");
/// let name = NamedNodeRef::new_unchecked("http://schema.org/givenName");
/// let mut store = TripleStore::new();
/// store.add(&Triple::new(ex, name, Literal::new_simple_literal("Thomas")));
/// assert_eq!(store.find(Some(ex.into()), Some(name), None).len(), 1);
/// assert!(store.find(None, None, Some(ex.into())).is_empty());
/// ```
#[derive(Default, Clone)]
pub struct TripleStore {
    graph: Graph,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all the triples matching the pattern, `None` being a wildcard.
    pub fn find(
        &self,
        subject: Option<SubjectRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Vec<Triple> {
        let matches = |t: &TripleRef<'_>| {
            subject.is_none_or(|s| t.subject == s)
                && predicate.is_none_or(|p| t.predicate == p)
                && object.is_none_or(|o| t.object == o)
        };
        match (subject, predicate, object) {
            (Some(s), _, _) => self
                .graph
                .triples_for_subject(s)
                .filter(matches)
                .map(TripleRef::into_owned)
                .collect(),
            (None, Some(p), Some(o)) => self
                .graph
                .subjects_for_predicate_object(p, o)
                .map(|s| Triple::new(s.into_owned(), p.into_owned(), o.into_owned()))
                .collect(),
            (None, Some(p), None) => self
                .graph
                .triples_for_predicate(p)
                .map(TripleRef::into_owned)
                .collect(),
            (None, None, Some(o)) => self
                .graph
                .triples_for_object(o)
                .map(TripleRef::into_owned)
                .collect(),
            (None, None, None) => self.graph.iter().map(TripleRef::into_owned).collect(),
        }
    }

    /// Checks if `subject rdf:type class` is asserted.
    pub fn is_instance_of<'a>(
        &self,
        subject: impl Into<SubjectRef<'a>>,
        class: impl Into<NamedNodeRef<'a>>,
    ) -> bool {
        let class: NamedNodeRef<'a> = class.into();
        self.graph
            .contains(TripleRef::new(subject, oxrdf::vocab::rdf::TYPE, class))
    }

    pub fn contains<'a>(&self, triple: impl Into<TripleRef<'a>>) -> bool {
        self.graph.contains(triple)
    }

    pub fn add<'a>(&mut self, triple: impl Into<TripleRef<'a>>) -> &mut Self {
        self.graph.insert(triple);
        self
    }

    pub fn remove<'a>(&mut self, triple: impl Into<TripleRef<'a>>) -> &mut Self {
        self.graph.remove(triple);
        self
    }

    /// Adds all the triples of `other`.
    pub fn merge(&mut self, other: &Self) -> &mut Self {
        for triple in &other.graph {
            self.graph.insert(triple);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TripleRef<'_>> {
        self.graph.iter()
    }

    pub fn as_graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

impl From<Graph> for TripleStore {
    fn from(graph: Graph) -> Self {
        Self { graph }
    }
}

impl FromIterator<Triple> for TripleStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut store = Self::new();
        for triple in iter {
            store.add(&triple);
        }
        store
    }
}

impl<'a> Extend<&'a Triple> for TripleStore {
    fn extend<I: IntoIterator<Item = &'a Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.graph.insert(triple);
        }
    }
}

impl fmt::Debug for TripleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.graph.iter()).finish()
    }
}

impl fmt::Display for TripleStore {
    /// Writes the triples as N-Triples.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for triple in &self.graph {
            writeln!(f, "{triple} .")?;
        }
        Ok(())
    }
}

/// Shared handle on the triples downloaded for a resource.
///
/// All the fields resolved from the same fetch hold a clone of the same handle.
/// Mutations are applied in place once the remote store accepted them.
#[derive(Clone, Default)]
pub struct GraphHandle(Arc<RwLock<TripleStore>>);

impl GraphHandle {
    pub fn new(store: TripleStore) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    /// Runs `f` with read access to the triples.
    pub fn read<T>(&self, f: impl FnOnce(&TripleStore) -> T) -> T {
        f(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Runs `f` with write access to the triples.
    pub fn write<T>(&self, f: impl FnOnce(&mut TripleStore) -> T) -> T {
        f(&mut self.0.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Removes `deletes` then adds `inserts`.
    pub fn apply(&self, inserts: &[Triple], deletes: &[Triple]) {
        self.write(|store| {
            for triple in deletes {
                store.remove(triple);
            }
            for triple in inserts {
                store.add(triple);
            }
        });
    }

    /// Returns a copy of the current triples.
    pub fn snapshot(&self) -> TripleStore {
        self.read(Clone::clone)
    }

    /// Checks if both handles point to the same triples.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<TripleStore> for GraphHandle {
    fn from(store: TripleStore) -> Self {
        Self::new(store)
    }
}

impl fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|store| f.debug_tuple("GraphHandle").field(&store.len()).finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::rdf;
    use oxrdf::{Literal, NamedNode};

    fn node(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    fn sample() -> TripleStore {
        let thomas = node("http://example.org/cont/tdupont");
        let person = node("http://schema.org/Person");
        let email = node("http://schema.org/email");
        [
            Triple::new(thomas.clone(), rdf::TYPE, person),
            Triple::new(thomas.clone(), email.clone(), Literal::new_simple_literal("a@x.org")),
            Triple::new(thomas, email, Literal::new_simple_literal("b@x.org")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_find_patterns() {
        let store = sample();
        let thomas = node("http://example.org/cont/tdupont");
        let email = node("http://schema.org/email");
        let person = node("http://schema.org/Person");
        assert_eq!(store.find(None, None, None).len(), 3);
        assert_eq!(store.find(Some(thomas.as_ref().into()), None, None).len(), 3);
        assert_eq!(
            store
                .find(Some(thomas.as_ref().into()), Some(email.as_ref()), None)
                .len(),
            2
        );
        assert_eq!(store.find(None, Some(email.as_ref()), None).len(), 2);
        let typed = store.find(None, Some(rdf::TYPE), Some(person.as_ref().into()));
        assert_eq!(typed, vec![Triple::new(thomas, rdf::TYPE, person)]);
    }

    #[test]
    fn test_add_remove_chain() {
        let mut store = TripleStore::new();
        let s = node("http://example.org/s");
        let t1 = Triple::new(s.clone(), rdf::TYPE, node("http://example.org/A"));
        let t2 = Triple::new(s, rdf::TYPE, node("http://example.org/B"));
        store.add(&t1).add(&t2).remove(&t1);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&t2));
        store.add(&t2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_handle_is_shared() {
        let handle = GraphHandle::new(sample());
        let other = handle.clone();
        let thomas = node("http://example.org/cont/tdupont");
        let deletes = handle.read(|store| store.find(Some(thomas.as_ref().into()), None, None));
        handle.apply(&[], &deletes);
        assert!(other.read(TripleStore::is_empty));
        assert!(handle.ptr_eq(&other));
    }
}
