//! Field resolution: turns typed queries and mutations into reads and writes of LDP resources.
//!
//! Every field goes through [`Resolver::resolve`], which dispatches on the directive of the field:
//! identifiers and properties are read from the graph of the parent context,
//! entry points are handled by the query or the mutation handler.

mod mutation;
mod query;
mod state;

pub use state::{ResolutionContext, canonical_identifier, parse_identifier, textual_identifier};

use crate::error::ResolveError;
use crate::schema::{Directive, FieldDef, MUTATION_TYPE, ObjectKind, ObjectType, SchemaDefinition};
use crate::target::TargetResolver;
use crate::transport::LdpClient;
use oxrdf::NamedNodeRef;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// The value produced for a field.
#[derive(Debug, Clone)]
pub enum Resolved {
    Null,
    Scalar(JsonValue),
    List(Vec<Resolved>),
    /// An entity whose fields are resolved from the context.
    Node(ResolutionContext),
}

impl Resolved {
    /// Wraps `items` in a list if `list` is set, else returns the first one or null.
    fn from_items(items: Vec<Self>, list: bool) -> Self {
        if list {
            Self::List(items)
        } else {
            items.into_iter().next().unwrap_or(Self::Null)
        }
    }

    pub fn as_node(&self) -> Option<&ResolutionContext> {
        if let Self::Node(context) = self {
            Some(context)
        } else {
            None
        }
    }
}

/// A field to resolve.
#[derive(Debug, Clone, Copy)]
pub struct FieldRequest<'a> {
    /// The type declaring the field.
    pub owner: &'a ObjectType,
    pub field: &'a FieldDef,
    pub arguments: &'a Map<String, JsonValue>,
    /// The context of the parent value, `None` for root fields.
    pub parent: Option<&'a ResolutionContext>,
}

impl<'a> FieldRequest<'a> {
    fn argument(&self, name: &str) -> Option<&'a JsonValue> {
        self.arguments.get(name).filter(|v| !v.is_null())
    }

    fn parent(&self) -> Result<&'a ResolutionContext, ResolveError> {
        self.parent
            .ok_or_else(|| ResolveError::missing_context(&self.field.name))
    }

    /// Entry points declared on the mutation root or on a mutator type are mutations.
    fn is_mutation(&self) -> bool {
        self.owner.name == MUTATION_TYPE || matches!(self.owner.kind, ObjectKind::Mutator { .. })
    }
}

/// Resolves fields of a generated schema against an LDP store.
///
/// All the collaborators are given at construction time.
pub struct Resolver {
    schema: Arc<SchemaDefinition>,
    client: Arc<dyn LdpClient>,
    targets: Arc<dyn TargetResolver>,
}

impl Resolver {
    pub fn new(
        schema: Arc<SchemaDefinition>,
        client: Arc<dyn LdpClient>,
        targets: Arc<dyn TargetResolver>,
    ) -> Self {
        Self {
            schema,
            client,
            targets,
        }
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn client(&self) -> &dyn LdpClient {
        self.client.as_ref()
    }

    /// Resolves one field.
    pub async fn resolve(&self, request: FieldRequest<'_>) -> Result<Resolved, ResolveError> {
        match &request.field.directive {
            Some(Directive::Identifier) => Ok(request
                .parent()?
                .identifier()
                .map_or(Resolved::Null, |id| Resolved::Scalar(id.into()))),
            Some(Directive::Property(property)) => {
                if let Some(scalar) = request.field.ty.scalar() {
                    query::scalar(&request, property.as_ref(), scalar)
                } else {
                    query::relation(self, &request, property.as_ref())
                }
            }
            Some(Directive::Class(_)) | None => {
                if request.is_mutation() && !request.parent.is_some_and(|p| p.mutation_handled()) {
                    mutation::resolve(self, &request).await
                } else {
                    query::entry_point(self, &request).await
                }
            }
        }
    }

    /// The class bound to the type named `type_name`.
    fn class_of(&self, type_name: &str) -> Result<NamedNodeRef<'_>, ResolveError> {
        self.schema
            .class_of(type_name)
            .ok_or_else(|| ResolveError::MissingClass {
                type_name: type_name.to_owned(),
            })
    }

    /// The URL of the resource holding the instances of `class`.
    fn target(&self, class: NamedNodeRef<'_>) -> Result<String, ResolveError> {
        self.targets
            .resolve(class)
            .ok_or_else(|| ResolveError::NoTarget {
                class: class.into_owned(),
            })
    }
}
