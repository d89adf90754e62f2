use crate::error::ResolveError;
use crate::graph::GraphHandle;
use crate::transport::ResourceKind;
use oxiri::Iri;
use oxrdf::{NamedNode, Subject};
use serde_json::Value as JsonValue;

/// The state threaded from a field to its children.
///
/// Contexts are cheap to clone and children are derived with the `with_*` methods.
/// The graph is shared by all the contexts derived from the same download.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    subject: Option<Subject>,
    graph: GraphHandle,
    resource_kind: ResourceKind,
    request_url: String,
    mutation_handled: bool,
}

impl ResolutionContext {
    /// Creates a context on the document downloaded from `request_url`.
    pub fn new(
        request_url: impl Into<String>,
        resource_kind: ResourceKind,
        graph: GraphHandle,
    ) -> Self {
        Self {
            subject: None,
            graph,
            resource_kind,
            request_url: request_url.into(),
            mutation_handled: false,
        }
    }

    /// The current entity, if any.
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.resource_kind
    }

    /// URL of the document holding the current entity.
    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    /// Whether a mutation has already been applied on the path leading to this context.
    pub fn mutation_handled(&self) -> bool {
        self.mutation_handled
    }

    #[must_use]
    pub fn with_subject(&self, subject: impl Into<Subject>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_graph(&self, graph: GraphHandle) -> Self {
        Self {
            graph,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_request_url(&self, request_url: impl Into<String>) -> Self {
        Self {
            request_url: request_url.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_mutation_handled(&self) -> Self {
        Self {
            mutation_handled: true,
            ..self.clone()
        }
    }

    /// The absolute identifier of the current entity.
    pub fn identifier(&self) -> Option<String> {
        self.subject
            .as_ref()
            .map(|subject| canonical_identifier(subject, &self.request_url))
    }
}

/// Returns the identifier exposed for `subject` found in the document at `request_url`.
pub fn canonical_identifier(subject: &Subject, request_url: &str) -> String {
    match subject {
        Subject::NamedNode(node) => textual_identifier(node.as_str(), request_url),
        Subject::BlankNode(node) => node.to_string(),
    }
}

/// Makes a possibly relative identifier absolute.
///
/// The empty identifier is the request URL itself and a fragment is appended to the request URL.
pub fn textual_identifier(id: &str, request_url: &str) -> String {
    if id.is_empty() {
        request_url.to_owned()
    } else if id.starts_with('#') {
        format!("{}{id}", crate::transport::document_url(request_url))
    } else if Iri::parse(id).is_ok() {
        id.to_owned()
    } else {
        Iri::parse(request_url)
            .and_then(|base| base.resolve(id))
            .map_or_else(|_| id.to_owned(), Iri::into_inner)
    }
}

/// Parses an identifier given as argument, resolving it against `request_url`.
pub fn parse_identifier(
    id: &JsonValue,
    name: &str,
    request_url: &str,
) -> Result<NamedNode, ResolveError> {
    let JsonValue::String(id) = id else {
        return Err(ResolveError::invalid_argument(name, "expecting a string"));
    };
    let iri = textual_identifier(id, request_url);
    NamedNode::new(iri.as_str()).map_err(|e| ResolveError::invalid_argument(name, e.to_string()))
}
