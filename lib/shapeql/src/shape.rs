//! Shape model: node shapes and their property shapes as read from SHACL triples.
//!
//! A [`Shape`] is built from all the triples grouped under one `sh:NodeShape` subject.
//! Each `sh:property` blank node is looked up in a blank node index built once over
//! the whole shapes graph to assemble its [`PropertyShape`].

use crate::context::ShapeContext;
use crate::error::ShapeError;
use crate::graph::TripleStore;
use crate::vocab::{rdf, shacl, xsd};
use oxrdf::{Literal, NamedNode, NamedNodeRef, Subject, SubjectRef, Term, Triple};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::warn;

/// Scalar kinds supported by the typed schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Float,
    String,
    Boolean,
}

impl ScalarType {
    /// Maps an XSD datatype to its scalar kind.
    ///
    /// Returns `None` for datatypes without scalar counterpart.
    pub fn from_datatype(datatype: NamedNodeRef<'_>) -> Option<Self> {
        match datatype {
            d if d == xsd::INT || d == xsd::INTEGER || d == xsd::LONG || d == xsd::SHORT => {
                Some(Self::Int)
            }
            d if d == xsd::FLOAT || d == xsd::DOUBLE || d == xsd::DECIMAL => Some(Self::Float),
            d if d == xsd::STRING || d == rdf::LANG_STRING => Some(Self::String),
            d if d == xsd::BOOLEAN => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Parses a GraphQL built-in scalar name.
    pub fn from_graphql_name(name: &str) -> Option<Self> {
        match name {
            "Int" => Some(Self::Int),
            "Float" => Some(Self::Float),
            "String" | "ID" => Some(Self::String),
            "Boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    pub const fn graphql_name(self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
        }
    }

    /// The datatype written when the shape does not declare one.
    pub fn default_datatype(self) -> NamedNodeRef<'static> {
        match self {
            Self::Int => xsd::INTEGER,
            Self::Float => xsd::DOUBLE,
            Self::String => xsd::STRING,
            Self::Boolean => xsd::BOOLEAN,
        }
    }

    /// Converts an RDF term into a JSON value of this kind.
    ///
    /// IRIs are only accepted as strings.
    pub fn coerce(self, term: &Term) -> Option<JsonValue> {
        let Term::Literal(literal) = term else {
            return if let (Self::String, Term::NamedNode(node)) = (self, term) {
                Some(JsonValue::String(node.as_str().into()))
            } else {
                None
            };
        };
        let value = literal.value().trim();
        match self {
            Self::Int => value.parse::<i64>().ok().map(JsonValue::from),
            Self::Float => value
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number),
            Self::String => Some(JsonValue::String(literal.value().into())),
            Self::Boolean => match value {
                "true" | "1" => Some(JsonValue::Bool(true)),
                "false" | "0" => Some(JsonValue::Bool(false)),
                _ => None,
            },
        }
    }

    /// Converts a JSON input value into a literal with the given datatype.
    pub fn to_literal(self, value: &JsonValue, datatype: NamedNodeRef<'_>) -> Option<Literal> {
        let lexical = match (self, value) {
            (Self::Int, JsonValue::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            (Self::Float, JsonValue::Number(n)) => n.to_string(),
            (Self::String, JsonValue::String(s)) => s.clone(),
            (Self::Boolean, JsonValue::Bool(b)) => b.to_string(),
            _ => return None,
        };
        Some(if datatype == xsd::STRING || datatype == rdf::LANG_STRING {
            Literal::new_simple_literal(lexical)
        } else {
            Literal::new_typed_literal(lexical, datatype)
        })
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.graphql_name())
    }
}

/// Deferred reference to the shape describing instances of a class.
///
/// Shapes may reference each other in cycles or before being declared,
/// so the lookup only happens when the reference is followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRef {
    class: NamedNode,
}

impl RelationRef {
    pub fn new(class: NamedNode) -> Self {
        Self { class }
    }

    pub fn class(&self) -> NamedNodeRef<'_> {
        self.class.as_ref()
    }

    /// Finds the shape whose `sh:targetClass` is the referenced class.
    pub fn resolve<'a>(&self, context: &'a ShapeContext) -> Option<&'a Shape> {
        let shape = context.shape_for_class(self.class.as_ref());
        if shape.is_none() {
            warn!("No shape targets class {}, the relation is ignored", self.class);
        }
        shape
    }
}

/// Value kind of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// Literal values of a known scalar kind.
    Scalar {
        scalar: ScalarType,
        datatype: NamedNode,
    },
    /// Links to instances of another shape.
    Relation(RelationRef),
    /// Neither a supported datatype nor a class.
    Unsupported,
}

/// One property constraint of a [`Shape`].
#[derive(Debug, Clone)]
pub struct PropertyShape {
    name: String,
    path: NamedNode,
    kind: PropertyKind,
    min_count: Option<u64>,
    max_count: Option<u64>,
}

impl PropertyShape {
    /// Builds a property shape from the triples of its node.
    ///
    /// Returns `None` if there is no IRI `sh:path`.
    pub fn from_triples(triples: &[Triple]) -> Option<Self> {
        let object = |predicate: NamedNodeRef<'_>| {
            triples
                .iter()
                .find(|t| t.predicate.as_ref() == predicate)
                .map(|t| &t.object)
        };
        let Some(Term::NamedNode(path)) = object(shacl::PATH) else {
            return None;
        };
        let name = match object(shacl::NAME) {
            Some(Term::Literal(name)) => sanitize_name(name.value()),
            _ => sanitize_name(local_name(path.as_str())),
        };
        let datatype = match object(shacl::DATATYPE) {
            Some(Term::NamedNode(datatype)) => Some(datatype),
            _ => None,
        };
        let scalar = datatype.and_then(|d| ScalarType::from_datatype(d.as_ref()));
        let kind = if let Some(scalar) = scalar {
            PropertyKind::Scalar {
                scalar,
                datatype: datatype.cloned().unwrap_or_else(|| scalar.default_datatype().into()),
            }
        } else if let Some(Term::NamedNode(class)) = object(shacl::CLASS) {
            PropertyKind::Relation(RelationRef::new(class.clone()))
        } else {
            PropertyKind::Unsupported
        };
        Some(Self {
            name,
            path: path.clone(),
            kind,
            min_count: object(shacl::MIN_COUNT).and_then(count),
            max_count: object(shacl::MAX_COUNT).and_then(count),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> NamedNodeRef<'_> {
        self.path.as_ref()
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        if let PropertyKind::Scalar { scalar, .. } = self.kind {
            Some(scalar)
        } else {
            None
        }
    }

    pub fn min_count(&self) -> Option<u64> {
        self.min_count
    }

    pub fn max_count(&self) -> Option<u64> {
        self.max_count
    }

    /// Multi-valued when `sh:maxCount` is absent or greater than one.
    pub fn is_list(&self) -> bool {
        self.max_count.is_none_or(|max| max > 1)
    }

    /// Required when `sh:minCount` is greater than zero.
    pub fn is_required(&self) -> bool {
        self.min_count.is_some_and(|min| min > 0)
    }
}

/// A node shape describing the instances of one class.
#[derive(Debug, Clone)]
pub struct Shape {
    id: Subject,
    name: String,
    target_class: Option<NamedNode>,
    property_shapes: Vec<PropertyShape>,
}

impl Shape {
    /// Builds a shape from the triples grouped under its subject.
    ///
    /// The group must assert exactly one `sh:NodeShape` subject.
    /// The objects of `sh:property` are resolved against `blank_nodes`.
    pub fn from_triples(triples: &[Triple], blank_nodes: &TripleStore) -> Result<Self, ShapeError> {
        let mut subjects = triples
            .iter()
            .filter(|t| {
                t.predicate == rdf::TYPE
                    && matches!(&t.object, Term::NamedNode(o) if *o == shacl::NODE_SHAPE)
            })
            .map(|t| &t.subject);
        let id = match (subjects.next(), subjects.count()) {
            (None, _) => return Err(ShapeError::MissingNodeShape),
            (Some(id), 0) => id.clone(),
            (Some(_), more) => return Err(ShapeError::AmbiguousNodeShape { count: more + 1 }),
        };
        let subject = &id;
        let own = |predicate: NamedNodeRef<'static>| {
            triples
                .iter()
                .filter(move |t| t.subject == *subject && t.predicate.as_ref() == predicate)
                .map(|t| &t.object)
        };
        let target_class = own(shacl::TARGET_CLASS).find_map(|o| match o {
            Term::NamedNode(class) => Some(class.clone()),
            _ => None,
        });
        let mut property_shapes: Vec<PropertyShape> = own(shacl::PROPERTY)
            .filter_map(|o| {
                let node: SubjectRef<'_> = match o {
                    Term::BlankNode(b) => b.as_ref().into(),
                    Term::NamedNode(n) => n.as_ref().into(),
                    _ => return None,
                };
                let property =
                    PropertyShape::from_triples(&blank_nodes.find(Some(node), None, None));
                if property.is_none() {
                    warn!("Property shape {node} of {id} has no sh:path IRI, it is ignored");
                }
                property
            })
            .collect();
        // Triples have no stable order
        property_shapes.sort_by(|a, b| a.name.cmp(&b.name));
        let name = if let Subject::NamedNode(node) = &id {
            shape_name(node.as_str())
        } else {
            shape_name(&id.to_string())
        };
        Ok(Self {
            id,
            name,
            target_class,
            property_shapes,
        })
    }

    pub fn id(&self) -> &Subject {
        &self.id
    }

    /// Type name derived from the shape IRI.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_class(&self) -> Option<NamedNodeRef<'_>> {
        self.target_class.as_ref().map(NamedNode::as_ref)
    }

    pub fn property_shapes(&self) -> &[PropertyShape] {
        &self.property_shapes
    }
}

/// Returns the fragment of an IRI, or its last path segment.
pub(crate) fn local_name(iri: &str) -> &str {
    if let Some((_, fragment)) = iri.rsplit_once('#') {
        if !fragment.is_empty() {
            return fragment;
        }
    }
    iri.trim_end_matches(['/', '#'])
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(iri)
}

/// Turns a shape IRI like `ex:ContactShape` into a type name like `Contact`.
fn shape_name(iri: &str) -> String {
    let local = local_name(iri);
    let local = local
        .strip_suffix("Shape")
        .filter(|rest| !rest.is_empty())
        .unwrap_or(local);
    capitalize(&sanitize_name(local))
}

/// Replaces the characters not allowed in GraphQL names.
pub(crate) fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() || sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn count(term: &Term) -> Option<u64> {
    if let Term::Literal(literal) = term {
        literal.value().trim().parse().ok()
    } else {
        None
    }
}
