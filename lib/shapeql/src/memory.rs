//! An in-memory LDP store.

use crate::error::TransportError;
use crate::graph::TripleStore;
use crate::transport::{LdpClient, Patch, ResourceKind};
use crate::vocab::{ldp, rdf};
use async_trait::async_trait;
use oxrdf::{NamedNode, Triple};
use oxttl::TurtleParser;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A call received by a [`MemoryLdpClient`].
#[derive(Debug, Clone)]
pub enum Call {
    ResourceKind(String),
    Download(String),
    Patch { url: String, patch: Patch },
    Put { url: String, graph: TripleStore },
    Delete(String),
}

impl Call {
    pub fn url(&self) -> &str {
        match self {
            Self::ResourceKind(url) | Self::Download(url) | Self::Delete(url) => url,
            Self::Patch { url, .. } | Self::Put { url, .. } => url,
        }
    }

    /// Returns true for calls modifying the store.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Patch { .. } | Self::Put { .. } | Self::Delete(_))
    }
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, TripleStore>,
    containers: BTreeSet<String>,
    calls: Vec<Call>,
}

/// An [`LdpClient`] keeping documents and containers in memory.
///
/// Containers list their direct children with `ldp:contains`.
/// Patches follow the Solid N3 Patch semantics: deleting a triple that is not in the document fails
/// with a 409 status and patching a missing document creates it.
///
/// ```
/// use shapeql::{LdpClient, MemoryLdpClient, ResourceKind};
///
/// # tokio::runtime::Builder::new_current_thread().build()?.block_on(async {
/// let store = MemoryLdpClient::new();
/// store.add_container("http://example.org/cont/");
/// store.load_turtle(
///     "http://example.org/cont/tdupont",
///     "<#me> a <http://schema.org/Person> .",
/// )?;
/// assert_eq!(
///     store.fetch_resource_kind("http://example.org/cont/").await?,
///     ResourceKind::Container
/// );
/// assert_eq!(store.download_graph("http://example.org/cont/").await?.len(), 3);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # })?;
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default)]
pub struct MemoryLdpClient {
    state: Mutex<State>,
}

impl MemoryLdpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declares a container. Its URL should end with a `/`.
    pub fn add_container(&self, url: impl Into<String>) -> &Self {
        self.lock().containers.insert(url.into());
        self
    }

    /// Creates or replaces a document.
    pub fn insert_document(&self, url: impl Into<String>, graph: TripleStore) -> &Self {
        self.lock().documents.insert(url.into(), graph);
        self
    }

    /// Parses Turtle using `url` as base IRI and adds the triples to the document at `url`.
    pub fn load_turtle(&self, url: &str, turtle: &str) -> Result<&Self, TransportError> {
        let triples = TurtleParser::new()
            .with_base_iri(url)
            .map_err(|e| TransportError::invalid_url(url, e))?
            .for_reader(turtle.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TransportError::parse(url, e))?;
        self.lock()
            .documents
            .entry(url.to_owned())
            .or_default()
            .extend(&triples);
        Ok(self)
    }

    /// Returns a copy of the document at `url`.
    pub fn document(&self, url: &str) -> Option<TripleStore> {
        self.lock().documents.get(url).cloned()
    }

    /// URLs of all the documents.
    pub fn document_urls(&self) -> Vec<String> {
        self.lock().documents.keys().cloned().collect()
    }

    /// All the calls received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// The calls received so far that modified the store.
    pub fn writes(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, call: Call) -> MutexGuard<'_, State> {
        debug!("In-memory LDP call {call:?}");
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

impl State {
    fn container_graph(&self, url: &str) -> Result<TripleStore, TransportError> {
        let container = NamedNode::new(url).map_err(|e| TransportError::invalid_url(url, e))?;
        let mut graph = self.documents.get(url).cloned().unwrap_or_default();
        graph
            .add(&Triple::new(container.clone(), rdf::TYPE, ldp::CONTAINER))
            .add(&Triple::new(container.clone(), rdf::TYPE, ldp::BASIC_CONTAINER));
        let children = self
            .documents
            .keys()
            .chain(&self.containers)
            .filter(|child| is_direct_child(url, child));
        for child in children {
            let child = NamedNode::new(child.as_str())
                .map_err(|e| TransportError::invalid_url(child.as_str(), e))?;
            graph.add(&Triple::new(container.clone(), ldp::CONTAINS, child));
        }
        Ok(graph)
    }
}

fn is_direct_child(container: &str, url: &str) -> bool {
    url.strip_prefix(container).is_some_and(|rest| {
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        !rest.is_empty() && !rest.contains('/')
    })
}

#[async_trait]
impl LdpClient for MemoryLdpClient {
    async fn fetch_resource_kind(&self, url: &str) -> Result<ResourceKind, TransportError> {
        let state = self.record(Call::ResourceKind(url.into()));
        if state.containers.contains(url) {
            Ok(ResourceKind::Container)
        } else if state.documents.contains_key(url) {
            Ok(ResourceKind::Document)
        } else {
            Err(TransportError::not_found(url))
        }
    }

    async fn download_graph(&self, url: &str) -> Result<TripleStore, TransportError> {
        let state = self.record(Call::Download(url.into()));
        if state.containers.contains(url) {
            state.container_graph(url)
        } else {
            state
                .documents
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::not_found(url))
        }
    }

    async fn patch(&self, url: &str, patch: &Patch) -> Result<(), TransportError> {
        let mut state = self.record(Call::Patch {
            url: url.into(),
            patch: patch.clone(),
        });
        let document = state.documents.entry(url.to_owned()).or_default();
        if let Some(missing) = patch.deletes.iter().find(|t| !document.contains(*t)) {
            return Err(TransportError::http(
                url,
                409,
                format!("The document does not contain {missing} ."),
            ));
        }
        for triple in &patch.deletes {
            document.remove(triple);
        }
        document.extend(&patch.inserts);
        Ok(())
    }

    async fn put(&self, url: &str, graph: &TripleStore) -> Result<(), TransportError> {
        let mut state = self.record(Call::Put {
            url: url.into(),
            graph: graph.clone(),
        });
        state.documents.insert(url.to_owned(), graph.clone());
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<(), TransportError> {
        let mut state = self.record(Call::Delete(url.into()));
        let removed_document = state.documents.remove(url).is_some();
        let removed_container = state.containers.remove(url);
        if removed_document || removed_container {
            Ok(())
        } else {
            Err(TransportError::not_found(url))
        }
    }
}
