use super::query::{entry_point, lookup_instance};
use super::{
    FieldRequest, Resolved, Resolver, ResolutionContext, parse_identifier, textual_identifier,
};
use crate::error::{ResolveError, SchemaError};
use crate::generator::{IDENTIFIER_FIELD, INPUT_ARGUMENT, SLUG_FIELD};
use crate::graph::{GraphHandle, TripleStore};
use crate::schema::{InputFieldDef, InputType, ObjectKind};
use crate::shape::decapitalize;
use crate::transport::{Patch, ResourceKind, document_url};
use crate::vocab::rdf;
use oxrdf::{Literal, NamedNode, Subject, Term, Triple};
use rustc_hash::FxHashSet;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// Mutation kinds, recognized from the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationKind {
    Delete,
    Update,
    Create,
    Mutate,
    Relation(RelationMutation),
    /// Not a mutation: the field is read like a query entry point.
    Read,
}

/// Mutations of a relation of the parent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationMutation {
    Set,
    Clear,
    Add,
    Remove,
    Link,
    Unlink,
}

impl MutationKind {
    /// Classifies a field name, returning the kind and the rest of the name after the verb.
    fn classify(name: &str) -> (Self, &str) {
        match name {
            "delete" => return (Self::Delete, ""),
            "update" => return (Self::Update, ""),
            _ => (),
        }
        for (prefix, kind) in [
            ("create", Self::Create),
            ("mutate", Self::Mutate),
            ("set", Self::Relation(RelationMutation::Set)),
            ("clear", Self::Relation(RelationMutation::Clear)),
            ("add", Self::Relation(RelationMutation::Add)),
            ("remove", Self::Relation(RelationMutation::Remove)),
            ("link", Self::Relation(RelationMutation::Link)),
            ("unlink", Self::Relation(RelationMutation::Unlink)),
        ] {
            match name.strip_prefix(prefix) {
                Some(suffix) if !suffix.is_empty() => return (kind, suffix),
                _ => (),
            }
        }
        (Self::Read, name)
    }
}

pub(super) async fn resolve(
    resolver: &Resolver,
    request: &FieldRequest<'_>,
) -> Result<Resolved, ResolveError> {
    let (kind, suffix) = MutationKind::classify(&request.field.name);
    debug!("Resolving {} as {kind:?}", request.field.name);
    match kind {
        MutationKind::Create => create(resolver, request).await,
        MutationKind::Mutate => mutate(resolver, request).await,
        MutationKind::Delete => delete(resolver, request).await,
        MutationKind::Update => update(resolver, request).await,
        MutationKind::Relation(mutation) => relation(resolver, request, mutation, suffix).await,
        MutationKind::Read => entry_point(resolver, request).await,
    }
}

/// Creates an entity: a new document in a container, or new triples in a document.
async fn create(resolver: &Resolver, request: &FieldRequest<'_>) -> Result<Resolved, ResolveError> {
    let class = resolver.class_of(&request.field.ty.name)?;
    let target = resolver.target(class)?;
    let (input_type, values) = input_object(resolver, request)?;
    let kind = resolver.client.fetch_resource_kind(&target).await?;
    let (document, subject) = match kind {
        ResourceKind::Container => {
            let (document, subject) = mint_document(&target, values)?;
            ensure_absent(resolver, &document).await?;
            (document, subject)
        }
        ResourceKind::Document => (target.clone(), mint_subject(&target, values)?),
    };
    let mut inserts = vec![Triple::new(subject.clone(), rdf::TYPE, class)];
    inserts.extend(scalar_triples(&subject, input_type, values)?);
    match kind {
        ResourceKind::Container => {
            let graph: TripleStore = inserts.iter().cloned().collect();
            resolver.client.put(&document, &graph).await?;
        }
        ResourceKind::Document => {
            resolver
                .client
                .patch(&document, &Patch::new(inserts.clone(), Vec::new()))
                .await?;
        }
    }
    debug!("Created {subject} in {document}");
    let graph = GraphHandle::default();
    graph.apply(&inserts, &[]);
    Ok(Resolved::Node(
        ResolutionContext::new(document, kind, graph)
            .with_subject(subject)
            .with_mutation_handled(),
    ))
}

/// Fails if `document` already exists, a `PUT` would replace it.
async fn ensure_absent(resolver: &Resolver, document: &str) -> Result<(), ResolveError> {
    match resolver.client.fetch_resource_kind(document).await {
        Ok(_) => Err(ResolveError::AlreadyExists {
            url: document.to_owned(),
        }),
        Err(e) if e.status() == Some(404) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Looks up the entity the mutators of `<T>Mutation` apply to.
async fn mutate(resolver: &Resolver, request: &FieldRequest<'_>) -> Result<Resolved, ResolveError> {
    let class = resolver.class_of(&request.field.ty.name)?;
    let target = resolver.target(class)?;
    let id = request
        .argument(IDENTIFIER_FIELD)
        .ok_or_else(|| ResolveError::invalid_argument(IDENTIFIER_FIELD, "an id is required"))?;
    let subject = parse_identifier(id, IDENTIFIER_FIELD, &target)?;
    let context = lookup_instance(resolver, class, &target, subject.into()).await?;
    Ok(context.map_or(Resolved::Null, Resolved::Node))
}

/// Removes all the triples of the entity and returns them as a detached graph.
///
/// The detached graph also holds the triples reachable from the entity so nested relations
/// of the deleted state can still be read.
async fn delete(resolver: &Resolver, request: &FieldRequest<'_>) -> Result<Resolved, ResolveError> {
    let context = request.parent()?;
    let subject = named_subject(request, context)?;
    let (deletes, reachable) = context.graph().read(|graph| {
        let deletes = graph.find(Some(subject.as_ref().into()), None, None);
        let reachable = reachable_triples(graph, subject, &deletes);
        (deletes, reachable)
    });
    match context.resource_kind() {
        ResourceKind::Container => resolver.client.delete(context.request_url()).await?,
        ResourceKind::Document => {
            if !deletes.is_empty() {
                resolver
                    .client
                    .patch(context.request_url(), &Patch::new(Vec::new(), deletes.clone()))
                    .await?;
            }
        }
    }
    debug!("Deleted {subject} from {}", context.request_url());
    context.graph().apply(&[], &deletes);
    let removed = GraphHandle::new(deletes.into_iter().chain(reachable).collect());
    Ok(Resolved::Node(
        context.with_graph(removed).with_mutation_handled(),
    ))
}

/// The triples of the nodes transitively linked from `triples`, the deleted entity excluded.
fn reachable_triples(graph: &TripleStore, entity: &NamedNode, triples: &[Triple]) -> Vec<Triple> {
    let mut visited = FxHashSet::default();
    visited.insert(Subject::from(entity.clone()));
    let mut pending: Vec<Subject> = triples.iter().filter_map(|t| node(&t.object)).collect();
    let mut reachable = Vec::new();
    while let Some(next) = pending.pop() {
        if !visited.insert(next.clone()) {
            continue;
        }
        for triple in graph.find(Some(next.as_ref()), None, None) {
            pending.extend(node(&triple.object));
            reachable.push(triple);
        }
    }
    reachable
}

fn node(term: &Term) -> Option<Subject> {
    match term {
        Term::NamedNode(node) => Some(node.clone().into()),
        Term::BlankNode(node) => Some(node.clone().into()),
        _ => None,
    }
}

/// Replaces the values of the properties present in the input.
async fn update(resolver: &Resolver, request: &FieldRequest<'_>) -> Result<Resolved, ResolveError> {
    let context = request.parent()?;
    let subject = named_subject(request, context)?;
    let entity = resolver.schema.try_object(&request.field.ty.name)?;
    let (input_type, values) = input_object(resolver, request)?;
    let mut patch = Patch::default();
    for (name, value) in values {
        let field = input_field(input_type, name)?;
        let Some(property) = field.property() else {
            continue;
        };
        // The input type is relaxed, the shape cardinality is not
        if value.is_null() && entity.field(name).is_some_and(|f| f.ty.non_null) {
            return Err(ResolveError::NullOnNonNullable {
                type_name: entity.name.clone(),
                field: name.clone(),
            });
        }
        let existing = context
            .graph()
            .read(|graph| graph.find(Some(subject.as_ref().into()), Some(property), None));
        for triple in existing {
            patch.delete(triple);
        }
        for literal in literals(field, value)? {
            patch.insert(Triple::new(subject.clone(), property, literal));
        }
    }
    apply_patch(resolver, context, &patch).await?;
    Ok(Resolved::Node(context.with_mutation_handled()))
}

/// `set`, `clear`, `add`, `remove`, `link` and `unlink` on a relation of the parent entity.
async fn relation(
    resolver: &Resolver,
    request: &FieldRequest<'_>,
    mutation: RelationMutation,
    suffix: &str,
) -> Result<Resolved, ResolveError> {
    let context = request.parent()?;
    let subject = named_subject(request, context)?;
    let ObjectKind::Mutator { entity } = &request.owner.kind else {
        return Err(SchemaError::UnknownType(format!("{}Mutation", request.owner.name)).into());
    };
    let field_name = decapitalize(suffix);
    let field = resolver
        .schema
        .try_object(entity)?
        .field(&field_name)
        .ok_or_else(|| SchemaError::UnknownType(format!("{entity}.{field_name}")))?;
    let property = field
        .property()
        .ok_or_else(|| SchemaError::UnknownType(format!("{entity}.{field_name}")))?;
    let existing = context
        .graph()
        .read(|graph| graph.find(Some(subject.as_ref().into()), Some(property), None));

    let mut patch = Patch::default();
    match mutation {
        RelationMutation::Set | RelationMutation::Add => {
            let class = resolver.class_of(&field.ty.name)?;
            let (input_type, values) = input_object(resolver, request)?;
            let child = mint_subject(context.request_url(), values)?;
            if mutation == RelationMutation::Set {
                for triple in existing {
                    patch.delete(triple);
                }
            }
            patch.insert(Triple::new(child.clone(), rdf::TYPE, class));
            for triple in scalar_triples(&child, input_type, values)? {
                patch.insert(triple);
            }
            patch.insert(Triple::new(subject.clone(), property, child));
        }
        RelationMutation::Link => {
            let linked = Triple::new(subject.clone(), property, id_argument(request, context)?);
            if !field.ty.list {
                for triple in existing {
                    if triple != linked {
                        patch.delete(triple);
                    }
                }
            }
            patch.insert(linked);
        }
        RelationMutation::Clear => {
            for triple in existing {
                patch.delete(triple);
            }
        }
        RelationMutation::Remove | RelationMutation::Unlink => {
            let unlinked = Triple::new(subject.clone(), property, id_argument(request, context)?);
            if existing.contains(&unlinked) {
                patch.delete(unlinked);
            }
        }
    }
    apply_patch(resolver, context, &patch).await?;
    Ok(Resolved::Node(context.with_mutation_handled()))
}

/// Sends `patch` to the document of `context` then applies it to the local graph.
async fn apply_patch(
    resolver: &Resolver,
    context: &ResolutionContext,
    patch: &Patch,
) -> Result<(), ResolveError> {
    if patch.is_empty() {
        debug!("Nothing to change in {}", context.request_url());
        return Ok(());
    }
    resolver.client.patch(context.request_url(), patch).await?;
    context.graph().apply(&patch.inserts, &patch.deletes);
    Ok(())
}

fn named_subject<'a>(
    request: &FieldRequest<'_>,
    context: &'a ResolutionContext,
) -> Result<&'a NamedNode, ResolveError> {
    match context.subject() {
        Some(Subject::NamedNode(node)) => Ok(node),
        Some(other) => Err(ResolveError::NotNamed(other.clone().into())),
        None => Err(ResolveError::missing_context(&request.field.name)),
    }
}

fn id_argument(
    request: &FieldRequest<'_>,
    context: &ResolutionContext,
) -> Result<NamedNode, ResolveError> {
    let id = request
        .argument(IDENTIFIER_FIELD)
        .ok_or_else(|| ResolveError::invalid_argument(IDENTIFIER_FIELD, "an id is required"))?;
    parse_identifier(id, IDENTIFIER_FIELD, context.request_url())
}

/// The input type and the value of the `input` argument.
fn input_object<'a>(
    resolver: &'a Resolver,
    request: &FieldRequest<'a>,
) -> Result<(&'a InputType, &'a Map<String, JsonValue>), ResolveError> {
    let argument = request
        .field
        .argument(INPUT_ARGUMENT)
        .ok_or_else(|| ResolveError::invalid_argument(INPUT_ARGUMENT, "not declared"))?;
    let input_type = resolver.schema.try_input(&argument.ty.name)?;
    match request.argument(INPUT_ARGUMENT) {
        Some(JsonValue::Object(values)) => Ok((input_type, values)),
        _ => Err(ResolveError::invalid_argument(
            INPUT_ARGUMENT,
            "expecting an input object",
        )),
    }
}

fn input_field<'a>(
    input_type: &'a InputType,
    name: &str,
) -> Result<&'a InputFieldDef, ResolveError> {
    input_type.field(name).ok_or_else(|| {
        ResolveError::invalid_argument(name, format!("not a field of {}", input_type.name))
    })
}

/// The triples stating the scalar values of an input object.
fn scalar_triples(
    subject: &NamedNode,
    input_type: &InputType,
    values: &Map<String, JsonValue>,
) -> Result<Vec<Triple>, ResolveError> {
    let mut triples = Vec::new();
    for (name, value) in values {
        let field = input_field(input_type, name)?;
        let Some(property) = field.property() else {
            continue;
        };
        for literal in literals(field, value)? {
            triples.push(Triple::new(subject.clone(), property, literal));
        }
    }
    Ok(triples)
}

/// Converts the value of an input field to literals. Null values give no literal.
fn literals(field: &InputFieldDef, value: &JsonValue) -> Result<Vec<Literal>, ResolveError> {
    let Some(property) = field.property() else {
        return Ok(Vec::new());
    };
    let scalar = field.ty.scalar().ok_or_else(|| SchemaError::NonScalarInput {
        field: field.name.clone(),
        type_name: field.ty.name.clone(),
    })?;
    let datatype = field
        .datatype
        .as_ref()
        .map_or_else(|| scalar.default_datatype(), NamedNode::as_ref);
    let items = match value {
        JsonValue::Array(items) => items.as_slice(),
        JsonValue::Null => &[],
        item => std::slice::from_ref(item),
    };
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| {
            scalar.to_literal(item, datatype).ok_or_else(|| {
                ResolveError::invalid_value(
                    property,
                    format!("expecting a {scalar} value, found {item}"),
                )
            })
        })
        .collect()
}

/// The string value of an optional argument of an input object.
fn text<'a>(
    values: &'a Map<String, JsonValue>,
    name: &str,
) -> Result<Option<&'a str>, ResolveError> {
    match values.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(value)) if !value.is_empty() => Ok(Some(value.as_str())),
        Some(_) => Err(ResolveError::invalid_argument(name, "expecting a non empty string")),
    }
}

fn random_name() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Mints the IRI of a new entity stored in `document`: the `id` if set, else a fragment from `slug`
/// or a random fragment.
fn mint_subject(
    document: &str,
    values: &Map<String, JsonValue>,
) -> Result<NamedNode, ResolveError> {
    let iri = if let Some(id) = text(values, IDENTIFIER_FIELD)? {
        textual_identifier(id, document)
    } else {
        let fragment = text(values, SLUG_FIELD)?.map_or_else(random_name, str::to_owned);
        format!("{}#{fragment}", document_url(document))
    };
    NamedNode::new(iri.as_str())
        .map_err(|e| ResolveError::invalid_argument(IDENTIFIER_FIELD, e.to_string()))
}

/// Mints a new document in `container` and the IRI of the entity it holds.
fn mint_document(
    container: &str,
    values: &Map<String, JsonValue>,
) -> Result<(String, NamedNode), ResolveError> {
    if text(values, IDENTIFIER_FIELD)?.is_some() {
        let subject = mint_subject(container, values)?;
        let document = document_url(subject.as_str());
        if document == container || document.ends_with('/') {
            return Err(ResolveError::invalid_argument(
                IDENTIFIER_FIELD,
                format!("{subject} is not stored in a document of {container}"),
            ));
        }
        return Ok((document.to_owned(), subject));
    }
    let name = text(values, SLUG_FIELD)?.map_or_else(random_name, str::to_owned);
    if name.contains(['/', '#', '?']) {
        return Err(ResolveError::invalid_argument(
            SLUG_FIELD,
            format!("{name} is not a document name"),
        ));
    }
    let document = format!("{container}{name}");
    let subject = NamedNode::new(format!("{document}#{name}"))
        .map_err(|e| ResolveError::invalid_argument(SLUG_FIELD, e.to_string()))?;
    Ok((document, subject))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(MutationKind::classify("delete"), (MutationKind::Delete, ""));
        assert_eq!(MutationKind::classify("update"), (MutationKind::Update, ""));
        assert_eq!(
            MutationKind::classify("createContact"),
            (MutationKind::Create, "Contact")
        );
        assert_eq!(
            MutationKind::classify("mutateContact"),
            (MutationKind::Mutate, "Contact")
        );
        assert_eq!(
            MutationKind::classify("setAddress"),
            (MutationKind::Relation(RelationMutation::Set), "Address")
        );
        assert_eq!(
            MutationKind::classify("unlinkWorksFor"),
            (MutationKind::Relation(RelationMutation::Unlink), "WorksFor")
        );
        assert_eq!(
            MutationKind::classify("linkWorksFor"),
            (MutationKind::Relation(RelationMutation::Link), "WorksFor")
        );
        assert_eq!(MutationKind::classify("contact"), (MutationKind::Read, "contact"));
        assert_eq!(MutationKind::classify("set"), (MutationKind::Read, "set"));
    }

    fn values(json: JsonValue) -> Map<String, JsonValue> {
        json.as_object().cloned().unwrap()
    }

    #[test]
    fn test_mint_subject() {
        let document = "http://example.org/cont/tdupont";
        assert_eq!(
            mint_subject(document, &values(serde_json::json!({"id": "http://example.org/x"})))
                .unwrap()
                .as_str(),
            "http://example.org/x"
        );
        assert_eq!(
            mint_subject(document, &values(serde_json::json!({"slug": "home"})))
                .unwrap()
                .as_str(),
            "http://example.org/cont/tdupont#home"
        );
        let random = mint_subject(document, &values(serde_json::json!({}))).unwrap();
        assert!(random.as_str().starts_with("http://example.org/cont/tdupont#"));
        assert!(mint_subject(document, &values(serde_json::json!({"slug": 3}))).is_err());
    }

    #[test]
    fn test_mint_document() {
        let container = "http://example.org/cont/";
        let (document, subject) =
            mint_document(container, &values(serde_json::json!({"slug": "jdoe"}))).unwrap();
        assert_eq!(document, "http://example.org/cont/jdoe");
        assert_eq!(subject.as_str(), "http://example.org/cont/jdoe#jdoe");
        let (document, subject) = mint_document(
            container,
            &values(serde_json::json!({"id": "http://example.org/cont/tdupont"})),
        )
        .unwrap();
        assert_eq!(document, "http://example.org/cont/tdupont");
        assert_eq!(subject.as_str(), "http://example.org/cont/tdupont");
        for id in ["#x", "", "http://example.org/cont/", "http://example.org/cont/#x"] {
            assert!(
                matches!(
                    mint_document(container, &values(serde_json::json!({ "id": id }))),
                    Err(ResolveError::InvalidArgument { .. })
                ),
                "{id} must be rejected"
            );
        }
        assert!(mint_document(container, &values(serde_json::json!({ "slug": "a/b" }))).is_err());
    }

    #[test]
    fn test_literals() {
        let field = InputFieldDef {
            name: "email".into(),
            ty: crate::schema::TypeExpr::named("String").list(),
            directive: Some(crate::schema::Directive::Property(
                NamedNode::new("http://schema.org/email").unwrap(),
            )),
            datatype: None,
        };
        let values = literals(&field, &serde_json::json!(["a@x.org", null, "b@x.org"])).unwrap();
        assert_eq!(
            values,
            [
                Literal::new_simple_literal("a@x.org"),
                Literal::new_simple_literal("b@x.org")
            ]
        );
        assert!(literals(&field, &JsonValue::Null).unwrap().is_empty());
        assert!(matches!(
            literals(&field, &serde_json::json!(3)),
            Err(ResolveError::InvalidValue { .. })
        ));
    }
}
