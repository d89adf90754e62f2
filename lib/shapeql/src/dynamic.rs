//! Binding of the generated schema to the async-graphql dynamic schema.

use crate::error::SchemaError;
use crate::resolve::{FieldRequest, Resolved, ResolutionContext, Resolver};
use crate::schema::{FieldDef, ObjectType, QUERY_TYPE, TypeExpr};
use async_graphql::Value;
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Schema,
    TypeRef,
};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Builds an executable schema whose fields are all resolved by `resolver`.
///
/// ```
/// use shapeql::{MemoryLdpClient, Resolver, SchemaGenerator, ShapeContext, StaticTargetResolver, build_schema};
/// use std::sync::Arc;
///
/// let shapes = r#"
///     @prefix sh: <http://www.w3.org/ns/shacl#> .
///     @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
///     <http://example.org/PersonShape> a sh:NodeShape ;
///         sh:targetClass <http://schema.org/Person> ;
///         sh:property [ sh:path <http://schema.org/name> ; sh:datatype xsd:string ] .
/// "#;
/// let definition = SchemaGenerator::new(ShapeContext::from_turtle(shapes.as_bytes(), None)?).generate()?;
/// let resolver = Resolver::new(
///     Arc::new(definition),
///     Arc::new(MemoryLdpClient::new()),
///     Arc::new(StaticTargetResolver::new()),
/// );
/// let schema = build_schema(Arc::new(resolver))?;
/// assert!(schema.sdl().contains("personCollection: [Person!]!"));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub fn build_schema(resolver: Arc<Resolver>) -> Result<Schema, SchemaError> {
    let definition = resolver.schema();
    let mutation = definition
        .mutation()
        .filter(|m| !m.fields.is_empty())
        .map(|m| m.name.clone());
    let mut builder = Schema::build(QUERY_TYPE, mutation.as_deref(), None);
    for object in definition.objects() {
        if object.fields.is_empty() {
            continue;
        }
        let owner = Arc::new(object.clone());
        let mut engine_object = Object::new(&object.name);
        for field in &object.fields {
            engine_object = engine_object.field(engine_field(&resolver, &owner, field));
        }
        builder = builder.register(engine_object);
    }
    for input in definition.inputs() {
        let mut engine_input = InputObject::new(&input.name);
        for field in &input.fields {
            engine_input = engine_input.field(InputValue::new(&field.name, type_ref(&field.ty)));
        }
        builder = builder.register(engine_input);
    }
    builder
        .finish()
        .map_err(|e| SchemaError::Engine(e.to_string()))
}

fn engine_field(resolver: &Arc<Resolver>, owner: &Arc<ObjectType>, field: &FieldDef) -> Field {
    let resolver = Arc::clone(resolver);
    let owner = Arc::clone(owner);
    let definition = Arc::new(field.clone());
    let mut engine_field = Field::new(&field.name, type_ref(&field.ty), move |ctx| {
        let resolver = Arc::clone(&resolver);
        let owner = Arc::clone(&owner);
        let definition = Arc::clone(&definition);
        FieldFuture::new(async move {
            let arguments = arguments(&ctx)?;
            let parent = ctx.parent_value.try_downcast_ref::<ResolutionContext>().ok();
            let resolved = resolver
                .resolve(FieldRequest {
                    owner: &owner,
                    field: &definition,
                    arguments: &arguments,
                    parent,
                })
                .await?;
            Ok::<_, async_graphql::Error>(into_field_value(resolved))
        })
    });
    for argument in &field.arguments {
        engine_field =
            engine_field.argument(InputValue::new(&argument.name, type_ref(&argument.ty)));
    }
    engine_field
}

fn arguments(ctx: &ResolverContext<'_>) -> Result<Map<String, JsonValue>, serde_json::Error> {
    ctx.args
        .iter()
        .map(|(name, value)| Ok((name.to_string(), value.as_value().clone().into_json()?)))
        .collect()
}

fn into_field_value<'a>(resolved: Resolved) -> Option<FieldValue<'a>> {
    match resolved {
        Resolved::Null => None,
        Resolved::Scalar(value) => Value::from_json(value).ok().map(FieldValue::value),
        Resolved::List(items) => Some(FieldValue::list(items.into_iter().map(|item| {
            into_field_value(item).unwrap_or_else(|| FieldValue::value(Value::Null))
        }))),
        Resolved::Node(context) => Some(FieldValue::owned_any(context)),
    }
}

fn type_ref(ty: &TypeExpr) -> TypeRef {
    let named = TypeRef::Named(ty.name.clone().into());
    let inner = if ty.list {
        TypeRef::List(Box::new(if ty.item_non_null {
            TypeRef::NonNull(Box::new(named))
        } else {
            named
        }))
    } else {
        named
    };
    if ty.non_null {
        TypeRef::NonNull(Box::new(inner))
    } else {
        inner
    }
}
