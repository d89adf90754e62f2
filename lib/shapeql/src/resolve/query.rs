use super::{FieldRequest, Resolved, Resolver, ResolutionContext, parse_identifier};
use crate::error::ResolveError;
use crate::generator::IDENTIFIER_FIELD;
use crate::graph::{GraphHandle, TripleStore};
use crate::shape::ScalarType;
use crate::transport::{ResourceKind, document_url};
use crate::vocab::{ldp, rdf};
use oxrdf::{NamedNodeRef, Subject, Term};
use tracing::{debug, warn};

/// Resolves a root entry point: one entity when an id is known, else all the instances of the class.
pub(super) async fn entry_point(
    resolver: &Resolver,
    request: &FieldRequest<'_>,
) -> Result<Resolved, ResolveError> {
    let class = resolver.class_of(&request.field.ty.name)?;
    let target = resolver.target(class)?;
    let subject = match request.argument(IDENTIFIER_FIELD) {
        Some(id) => Some(Subject::from(parse_identifier(id, IDENTIFIER_FIELD, &target)?)),
        None => request.parent.and_then(|p| p.subject().cloned()),
    };
    if let Some(subject) = subject {
        let context = lookup_instance(resolver, class, &target, subject).await?;
        return Ok(context.map_or(Resolved::Null, Resolved::Node));
    }
    let items = lookup_collection(resolver, class, &target)
        .await?
        .into_iter()
        .map(Resolved::Node)
        .collect();
    Ok(Resolved::from_items(items, request.field.ty.list))
}

/// Finds `subject` in the resource at `target`, or in its own document when `target` is a container.
pub(super) async fn lookup_instance(
    resolver: &Resolver,
    class: NamedNodeRef<'_>,
    target: &str,
    subject: Subject,
) -> Result<Option<ResolutionContext>, ResolveError> {
    let kind = resolver.client.fetch_resource_kind(target).await?;
    let document = match (kind, &subject) {
        (ResourceKind::Container, Subject::NamedNode(node)) => {
            document_url(node.as_str()).to_owned()
        }
        _ => target.to_owned(),
    };
    let graph = match resolver.client.download_graph(&document).await {
        Ok(graph) => graph,
        Err(e) if e.status() == Some(404) => {
            debug!("{document} does not exist, {subject} is not found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    if !graph.is_instance_of(subject.as_ref(), class) {
        debug!("{subject} is not an instance of {class} in {document}");
        return Ok(None);
    }
    Ok(Some(
        ResolutionContext::new(document, kind, graph.into()).with_subject(subject),
    ))
}

/// Finds all the instances of `class` in the resource at `target`.
///
/// The documents of a container are merged into a single shared graph.
async fn lookup_collection(
    resolver: &Resolver,
    class: NamedNodeRef<'_>,
    target: &str,
) -> Result<Vec<ResolutionContext>, ResolveError> {
    let kind = resolver.client.fetch_resource_kind(target).await?;
    let graph = match kind {
        ResourceKind::Document => resolver.client.download_graph(target).await?,
        ResourceKind::Container => {
            let listing = resolver.client.download_graph(target).await?;
            let mut members: Vec<String> = listing
                .find(None, Some(ldp::CONTAINS), None)
                .into_iter()
                .filter_map(|t| match t.object {
                    Term::NamedNode(member) if !member.as_str().ends_with('/') => {
                        Some(member.into_string())
                    }
                    _ => None,
                })
                .collect();
            members.sort();
            let mut merged = TripleStore::new();
            for member in &members {
                merged.merge(&resolver.client.download_graph(member).await?);
            }
            debug!("Merged {} documents of {target}", members.len());
            merged
        }
    };
    let subjects = instances(&graph, class);
    let graph = GraphHandle::from(graph);
    let root = ResolutionContext::new(target, kind, graph);
    Ok(subjects
        .into_iter()
        .map(|subject| entity_context(&root, subject))
        .collect())
}

/// Derives the context of `subject`, which lives in the document of its IRI for containers.
fn entity_context(context: &ResolutionContext, subject: Subject) -> ResolutionContext {
    match (&subject, context.resource_kind()) {
        (Subject::NamedNode(node), ResourceKind::Container) => context
            .with_request_url(document_url(node.as_str()))
            .with_subject(subject),
        _ => context.with_subject(subject),
    }
}

/// The subjects asserted as instances of `class`, in a stable order.
fn instances(graph: &TripleStore, class: NamedNodeRef<'_>) -> Vec<Subject> {
    let mut subjects: Vec<Subject> = graph
        .find(None, Some(rdf::TYPE), Some(class.into()))
        .into_iter()
        .map(|t| t.subject)
        .collect();
    subjects.sort_by_cached_key(Subject::to_string);
    subjects
}

/// Reads the values of a scalar property of the parent entity.
pub(super) fn scalar(
    request: &FieldRequest<'_>,
    property: NamedNodeRef<'_>,
    scalar: ScalarType,
) -> Result<Resolved, ResolveError> {
    let context = request.parent()?;
    let Some(subject) = context.subject() else {
        return Ok(Resolved::Null);
    };
    let mut objects: Vec<Term> = context
        .graph()
        .read(|graph| graph.find(Some(subject.as_ref()), Some(property), None))
        .into_iter()
        .map(|t| t.object)
        .collect();
    objects.sort_by_cached_key(Term::to_string);
    let items = objects
        .iter()
        .filter_map(|object| {
            let value = scalar.coerce(object);
            if value.is_none() {
                warn!("Value {object} of {property} can not be read as {scalar}, it is ignored");
            }
            value
        })
        .map(Resolved::Scalar)
        .collect();
    Ok(Resolved::from_items(items, request.field.ty.list))
}

/// Follows a relation of the parent entity, keeping only the objects that are instances of the field class.
pub(super) fn relation(
    resolver: &Resolver,
    request: &FieldRequest<'_>,
    property: NamedNodeRef<'_>,
) -> Result<Resolved, ResolveError> {
    let context = request.parent()?;
    let Some(subject) = context.subject() else {
        return Ok(Resolved::Null);
    };
    let class = resolver.schema.class_of(&request.field.ty.name);
    let mut objects: Vec<Subject> = context.graph().read(|graph| {
        graph
            .find(Some(subject.as_ref()), Some(property), None)
            .into_iter()
            .filter_map(|t| match t.object {
                Term::NamedNode(node) => Some(Subject::from(node)),
                Term::BlankNode(node) => Some(Subject::from(node)),
                _ => None,
            })
            .filter(|object| class.is_none_or(|class| graph.is_instance_of(object.as_ref(), class)))
            .collect()
    });
    objects.sort_by_cached_key(Subject::to_string);
    let items = objects
        .into_iter()
        .map(|object| Resolved::Node(entity_context(context, object)))
        .collect();
    Ok(Resolved::from_items(items, request.field.ty.list))
}
