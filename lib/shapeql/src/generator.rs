//! Generation of the typed schema from compiled shapes.

use crate::context::ShapeContext;
use crate::error::SchemaError;
use crate::schema::{
    ArgumentDef, Directive, FieldDef, ID_TYPE, InputFieldDef, InputType, MUTATION_TYPE,
    ObjectKind, ObjectType, QUERY_TYPE, SchemaDefinition, TypeExpr,
};
use crate::shape::{PropertyKind, Shape, capitalize, decapitalize};
use oxrdf::NamedNode;
use rustc_hash::FxHashSet;
use tracing::warn;

/// Name of the identifier field of every object type.
pub const IDENTIFIER_FIELD: &str = "id";
/// Name of the create input field minting the identifier from a fragment.
pub const SLUG_FIELD: &str = "slug";
/// Name of the argument holding mutation inputs.
pub const INPUT_ARGUMENT: &str = "input";

/// Builds a [`SchemaDefinition`] from a [`ShapeContext`].
///
/// ```
/// use shapeql::{SchemaGenerator, ShapeContext};
///
/// let shapes = r#"
///     @prefix sh: <http://www.w3.org/ns/shacl#> .
///     @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
///     @prefix schema: <http://schema.org/> .
///
///     <http://example.org/ContactShape> a sh:NodeShape ;
///         sh:targetClass schema:Person ;
///         sh:property [ sh:path schema:givenName ; sh:datatype xsd:string ; sh:minCount 1 ; sh:maxCount 1 ] .
/// "#;
/// let context = ShapeContext::from_turtle(shapes.as_bytes(), None)?;
/// let schema = SchemaGenerator::new(context).generate()?;
/// let contact = schema.object("Contact").unwrap();
/// assert_eq!(contact.field("givenName").unwrap().ty.to_string(), "String!");
/// assert!(schema.mutation().unwrap().field("createContact").is_some());
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug)]
pub struct SchemaGenerator {
    context: ShapeContext,
    input_order: Vec<String>,
}

impl SchemaGenerator {
    pub fn new(context: ShapeContext) -> Self {
        Self {
            context,
            input_order: Vec::new(),
        }
    }

    pub fn context(&self) -> &ShapeContext {
        &self.context
    }

    pub fn into_context(self) -> ShapeContext {
        self.context
    }

    /// Generates the root types, one object type per shape, the mutator types and the input types.
    pub fn generate(&mut self) -> Result<SchemaDefinition, SchemaError> {
        let names: Vec<String> = self
            .context
            .shapes()
            .iter()
            .map(|s| s.name().to_owned())
            .collect();
        let mut entities = Vec::with_capacity(names.len());
        for name in &names {
            entities.push(self.object_type(name)?);
        }

        let mut query = root_type(QUERY_TYPE);
        let mut mutation = root_type(MUTATION_TYPE);
        let mut mutators = Vec::with_capacity(entities.len());
        for entity in &entities {
            let singular = decapitalize(&entity.name);
            query.fields.push(
                FieldDef::new(singular.clone(), TypeExpr::named(&entity.name))
                    .with_argument(ArgumentDef::new(IDENTIFIER_FIELD, TypeExpr::named(ID_TYPE))),
            );
            query.fields.push(FieldDef::new(
                format!("{singular}Collection"),
                TypeExpr::named(&entity.name).non_null().list().non_null(),
            ));

            let create = self.create_input_type(&entity.name)?;
            mutation.fields.push(
                FieldDef::new(
                    format!("create{}", entity.name),
                    TypeExpr::named(&entity.name).non_null(),
                )
                .with_argument(ArgumentDef::new(
                    INPUT_ARGUMENT,
                    TypeExpr::named(create.name).non_null(),
                )),
            );
            let mutator = self.mutator_type(entity)?;
            mutation.fields.push(
                FieldDef::new(
                    format!("mutate{}", entity.name),
                    TypeExpr::named(&mutator.name),
                )
                .with_argument(ArgumentDef::new(
                    IDENTIFIER_FIELD,
                    TypeExpr::named(ID_TYPE).non_null(),
                )),
            );
            mutators.push(mutator);
        }

        let mut objects = vec![query, mutation];
        objects.extend(entities);
        objects.extend(mutators);
        let inputs = self
            .input_order
            .iter()
            .filter_map(|name| self.context.input_type(name).cloned())
            .collect();
        Ok(SchemaDefinition::new(objects, inputs))
    }

    /// Returns the object type generated for the shape named `name`.
    pub fn object_type(&mut self, name: &str) -> Result<ObjectType, SchemaError> {
        self.context
            .memoize_object_type(name, |context| {
                let shape = context
                    .shape(name)
                    .ok_or_else(|| SchemaError::UnknownType(name.to_owned()))?;
                Ok(build_object_type(context, shape))
            })
            .cloned()
    }

    /// Returns `Create<T>Input`: the scalar fields of `T` plus `id` and `slug`.
    pub fn create_input_type(&mut self, entity: &str) -> Result<InputType, SchemaError> {
        let name = format!("Create{entity}Input");
        let object_type = self.object_type(entity)?;
        self.track_input(&name);
        self.context
            .memoize_input_type(&name, |context| {
                let mut fields = scalar_input_fields(context, &object_type)?;
                fields.push(InputFieldDef {
                    name: IDENTIFIER_FIELD.into(),
                    ty: TypeExpr::named(ID_TYPE),
                    directive: None,
                    datatype: None,
                });
                fields.push(InputFieldDef {
                    name: SLUG_FIELD.into(),
                    ty: TypeExpr::named("String"),
                    directive: None,
                    datatype: None,
                });
                Ok(InputType {
                    name: name.clone(),
                    class: object_type.class.clone(),
                    fields,
                })
            })
            .cloned()
    }

    /// Returns `Update<T>Input`: the scalar fields of `T`, all of them optional.
    pub fn update_input_type(&mut self, entity: &str) -> Result<InputType, SchemaError> {
        let name = format!("Update{entity}Input");
        let object_type = self.object_type(entity)?;
        self.context
            .memoize_input_type(&name, |context| {
                let fields = scalar_input_fields(context, &object_type)?
                    .into_iter()
                    .map(|field| InputFieldDef {
                        ty: field.ty.nullable(),
                        ..field
                    })
                    .collect();
                Ok(InputType {
                    name: name.clone(),
                    class: object_type.class.clone(),
                    fields,
                })
            })
            .cloned()
    }

    fn mutator_type(&mut self, entity: &ObjectType) -> Result<ObjectType, SchemaError> {
        let returned = TypeExpr::named(&entity.name).non_null();
        let mut mutator = ObjectType {
            name: format!("{}Mutation", entity.name),
            kind: ObjectKind::Mutator {
                entity: entity.name.clone(),
            },
            class: entity.class.clone(),
            fields: vec![FieldDef::new("delete", returned.clone())],
        };

        let update = self.update_input_type(&entity.name)?;
        if !update.fields.is_empty() {
            self.track_input(&update.name);
            mutator.fields.push(
                FieldDef::new("update", returned.clone()).with_argument(ArgumentDef::new(
                    INPUT_ARGUMENT,
                    TypeExpr::named(update.name).non_null(),
                )),
            );
        }

        let id_argument = ArgumentDef::new(IDENTIFIER_FIELD, TypeExpr::named(ID_TYPE).non_null());
        for field in &entity.fields {
            if field.property().is_none() || field.ty.scalar().is_some() {
                continue;
            }
            let suffix = capitalize(&field.name);
            let input = ArgumentDef::new(
                INPUT_ARGUMENT,
                TypeExpr::named(self.create_input_type(&field.ty.name)?.name).non_null(),
            );
            if field.ty.list {
                mutator.fields.extend([
                    FieldDef::new(format!("add{suffix}"), returned.clone()).with_argument(input),
                    FieldDef::new(format!("remove{suffix}"), returned.clone())
                        .with_argument(id_argument.clone()),
                ]);
            } else {
                mutator.fields.extend([
                    FieldDef::new(format!("set{suffix}"), returned.clone()).with_argument(input),
                    FieldDef::new(format!("clear{suffix}"), returned.clone()),
                ]);
            }
            mutator.fields.extend([
                FieldDef::new(format!("link{suffix}"), returned.clone())
                    .with_argument(id_argument.clone()),
                FieldDef::new(format!("unlink{suffix}"), returned.clone())
                    .with_argument(id_argument.clone()),
            ]);
        }
        Ok(mutator)
    }

    fn track_input(&mut self, name: &str) {
        if !self.input_order.iter().any(|n| n == name) {
            self.input_order.push(name.to_owned());
        }
    }
}

fn root_type(name: &str) -> ObjectType {
    ObjectType {
        kind: ObjectKind::Root,
        ..ObjectType::new(name)
    }
}

fn build_object_type(context: &ShapeContext, shape: &Shape) -> ObjectType {
    let mut object_type = ObjectType::new(shape.name());
    object_type.class = shape.target_class().map(|c| c.into_owned());
    if object_type.class.is_none() {
        warn!("Shape {} has no sh:targetClass", shape.id());
    }
    object_type.fields.push(
        FieldDef::new(IDENTIFIER_FIELD, TypeExpr::named(ID_TYPE).non_null())
            .with_directive(Directive::Identifier),
    );
    let mut names = FxHashSet::default();
    names.insert(IDENTIFIER_FIELD.to_owned());
    for property in shape.property_shapes() {
        let type_name = match property.kind() {
            PropertyKind::Scalar { scalar, .. } => scalar.graphql_name().to_owned(),
            PropertyKind::Relation(relation) => {
                let Some(target) = relation.resolve(context) else {
                    continue;
                };
                target.name().to_owned()
            }
            PropertyKind::Unsupported => {
                warn!(
                    "Property {} of {} has neither a supported sh:datatype nor a sh:class, it is ignored",
                    property.path(),
                    shape.name()
                );
                continue;
            }
        };
        if !names.insert(property.name().to_owned()) {
            warn!(
                "Property {} of {} duplicates field {}, it is ignored",
                property.path(),
                shape.name(),
                property.name()
            );
            continue;
        }
        let mut ty = TypeExpr::named(type_name);
        if property.is_list() {
            ty = ty.list();
        }
        if property.is_required() {
            ty = ty.non_null();
        }
        object_type.fields.push(
            FieldDef::new(property.name(), ty)
                .with_directive(Directive::Property(property.path().into_owned())),
        );
    }
    object_type
}

/// The input fields mirroring the scalar property fields of `object_type`.
fn scalar_input_fields(
    context: &ShapeContext,
    object_type: &ObjectType,
) -> Result<Vec<InputFieldDef>, SchemaError> {
    let shape = context.shape(&object_type.name);
    object_type
        .fields
        .iter()
        .filter(|field| field.property().is_some() && field.ty.scalar().is_some())
        .map(|field| {
            let datatype = shape
                .and_then(|s| s.property_shapes().iter().find(|p| p.name() == field.name))
                .and_then(|p| match p.kind() {
                    PropertyKind::Scalar { datatype, .. } => Some(datatype.clone()),
                    _ => None,
                });
            input_field(field, datatype)
        })
        .collect()
}

/// Converts a property field into an input field.
///
/// Only scalar fields can be mutation inputs.
pub(crate) fn input_field(
    field: &FieldDef,
    datatype: Option<NamedNode>,
) -> Result<InputFieldDef, SchemaError> {
    if field.ty.scalar().is_none() {
        return Err(SchemaError::NonScalarInput {
            field: field.name.clone(),
            type_name: field.ty.name.clone(),
        });
    }
    Ok(InputFieldDef {
        name: field.name.clone(),
        ty: field.ty.clone(),
        directive: field.directive.clone(),
        datatype,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        @prefix schema: <http://schema.org/> .
        @prefix ex: <http://example.org/shapes#> .

        ex:ContactShape a sh:NodeShape ;
            sh:targetClass schema:Person ;
            sh:property [ sh:path schema:givenName ; sh:datatype xsd:string ; sh:minCount 1 ; sh:maxCount 1 ] ;
            sh:property [ sh:path schema:email ; sh:datatype xsd:string ] ;
            sh:property [ sh:path schema:address ; sh:class schema:PostalAddress ; sh:maxCount 1 ] ;
            sh:property [ sh:path schema:worksFor ; sh:class schema:Organization ] ;
            sh:property [ sh:path schema:knows ; sh:class schema:Person ] ;
            sh:property [ sh:path schema:spouse ; sh:class schema:Unknown ] ;
            sh:property [ sh:path schema:birthDate ; sh:datatype xsd:date ] .

        ex:AddressShape a sh:NodeShape ;
            sh:targetClass schema:PostalAddress ;
            sh:property [ sh:path schema:streetAddress ; sh:name "streetLine" ; sh:datatype xsd:string ; sh:maxCount 1 ] .

        ex:OrganizationShape a sh:NodeShape ;
            sh:targetClass schema:Organization ;
            sh:property [ sh:path schema:name ; sh:datatype xsd:string ; sh:maxCount 1 ] ;
            sh:property [ sh:path schema:employee ; sh:class schema:Person ] .

        ex:TagShape a sh:NodeShape .
    "#;

    fn generate() -> SchemaDefinition {
        let context = ShapeContext::from_turtle(SHAPES.as_bytes(), None).unwrap();
        SchemaGenerator::new(context).generate().unwrap()
    }

    #[test]
    fn test_one_object_type_per_shape() {
        let schema = generate();
        let names: Vec<_> = schema.entities().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Address", "Contact", "Organization", "Tag"]);
        for entity in schema.entities() {
            let id = entity.field(IDENTIFIER_FIELD).unwrap();
            assert_eq!(id.ty.to_string(), "ID!");
            assert_eq!(id.directive, Some(Directive::Identifier));
        }
    }

    #[test]
    fn test_fields_and_cardinality() {
        let schema = generate();
        let contact = schema.object("Contact").unwrap();
        let fields: Vec<_> = contact
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect();
        assert_eq!(
            fields,
            [
                "id: ID!",
                "address: Address",
                "email: [String]",
                "givenName: String!",
                "knows: [Contact]",
                "worksFor: [Organization]",
            ]
        );
        assert_eq!(
            contact.field("email").unwrap().property().map(|p| p.as_str()),
            Some("http://schema.org/email")
        );
        assert_eq!(
            schema.class_of("Contact").map(|c| c.as_str()),
            Some("http://schema.org/Person")
        );
        assert_eq!(schema.object("Tag").unwrap().fields.len(), 1);
    }

    #[test]
    fn test_query_entry_points() {
        let schema = generate();
        let query = schema.query().unwrap();
        let contact = query.field("contact").unwrap();
        assert_eq!(contact.ty.to_string(), "Contact");
        assert_eq!(contact.argument("id").unwrap().ty.to_string(), "ID");
        assert_eq!(
            query.field("contactCollection").unwrap().ty.to_string(),
            "[Contact!]!"
        );
        assert!(query.fields.iter().all(|f| f.directive.is_none()));
    }

    #[test]
    fn test_input_types() {
        let schema = generate();
        let create = schema.input("CreateContactInput").unwrap();
        let fields: Vec<_> = create
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect();
        assert_eq!(
            fields,
            ["email: [String]", "givenName: String!", "id: ID", "slug: String"]
        );
        assert_eq!(
            create.field("givenName").unwrap().datatype.as_ref().map(|d| d.as_str()),
            Some("http://www.w3.org/2001/XMLSchema#string")
        );
        let update = schema.input("UpdateContactInput").unwrap();
        let fields: Vec<_> = update
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect();
        assert_eq!(fields, ["email: [String]", "givenName: String"]);
        assert!(schema.input("UpdateTagInput").is_none());
        assert!(schema.input("CreateTagInput").is_some());
    }

    #[test]
    fn test_mutation_entry_points() {
        let schema = generate();
        let mutation = schema.mutation().unwrap();
        let create = mutation.field("createContact").unwrap();
        assert_eq!(create.ty.to_string(), "Contact!");
        assert_eq!(
            create.argument(INPUT_ARGUMENT).unwrap().ty.to_string(),
            "CreateContactInput!"
        );
        let mutate = mutation.field("mutateContact").unwrap();
        assert_eq!(mutate.ty.to_string(), "ContactMutation");
        assert_eq!(mutate.argument("id").unwrap().ty.to_string(), "ID!");

        let mutator = schema.object("ContactMutation").unwrap();
        let names: Vec<_> = mutator.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "delete",
                "update",
                "setAddress",
                "clearAddress",
                "linkAddress",
                "unlinkAddress",
                "addKnows",
                "removeKnows",
                "linkKnows",
                "unlinkKnows",
                "addWorksFor",
                "removeWorksFor",
                "linkWorksFor",
                "unlinkWorksFor",
            ]
        );
        assert_eq!(
            mutator
                .field("setAddress")
                .unwrap()
                .argument(INPUT_ARGUMENT)
                .unwrap()
                .ty
                .to_string(),
            "CreateAddressInput!"
        );
        assert_eq!(
            mutator.kind,
            ObjectKind::Mutator {
                entity: "Contact".into()
            }
        );
        let tag_mutator = schema.object("TagMutation").unwrap();
        assert_eq!(tag_mutator.fields.len(), 1);
    }

    #[test]
    fn test_types_are_generated_once() {
        let context = ShapeContext::from_turtle(SHAPES.as_bytes(), None).unwrap();
        let mut generator = SchemaGenerator::new(context);
        let first = generator.generate().unwrap();
        let second = generator.generate().unwrap();
        assert_eq!(first.sdl(), second.sdl());
        let count = first
            .inputs()
            .iter()
            .filter(|i| i.name == "CreateAddressInput")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_non_scalar_input_is_rejected() {
        let schema = generate();
        let address = schema.object("Contact").unwrap().field("address").unwrap();
        assert!(matches!(
            input_field(address, None),
            Err(SchemaError::NonScalarInput { .. })
        ));
    }
}
