//! Typed schema produced by the shape compiler.
//!
//! Types are addressed by name: a field only stores the name of its type,
//! so cyclic relations between shapes do not need any eager object graph.

use crate::error::SchemaError;
use crate::shape::ScalarType;
use oxrdf::{NamedNode, NamedNodeRef};
use std::fmt::{self, Write};

pub const QUERY_TYPE: &str = "Query";
pub const MUTATION_TYPE: &str = "Mutation";
pub const ID_TYPE: &str = "ID";

/// Metadata linking a type or field back to the IRI it comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `@identifier`: the field holds the IRI of the entity.
    Identifier,
    /// `@property(iri:)`: the field holds the values of a predicate.
    Property(NamedNode),
    /// `@is(class:)`: the type describes the instances of a class.
    Class(NamedNode),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier => f.write_str("@identifier"),
            Self::Property(iri) => write!(f, "@property(iri: \"{}\")", iri.as_str()),
            Self::Class(iri) => write!(f, "@is(class: \"{}\")", iri.as_str()),
        }
    }
}

/// A type expression: a named type, optionally wrapped in a list, optionally non-null.
///
/// The non-null flag applies to the whole value, list included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    pub name: String,
    pub list: bool,
    pub item_non_null: bool,
    pub non_null: bool,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            list: false,
            item_non_null: false,
            non_null: false,
        }
    }

    /// Wraps the type in a list.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.item_non_null = self.non_null;
        self.non_null = false;
        self.list = true;
        self
    }

    /// Makes the type (after any list wrapping) non-null.
    #[must_use]
    pub fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    /// Drops the non-null constraint of the outermost type.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.non_null = false;
        self
    }

    /// Returns the scalar kind of the named type, if it is a built-in scalar.
    pub fn scalar(&self) -> Option<ScalarType> {
        ScalarType::from_graphql_name(&self.name)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "[{}", self.name)?;
            if self.item_non_null {
                f.write_char('!')?;
            }
            f.write_char(']')?;
        } else {
            f.write_str(&self.name)?;
        }
        if self.non_null {
            f.write_char('!')?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDef {
    pub name: String,
    pub ty: TypeExpr,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A field of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
    pub arguments: Vec<ArgumentDef>,
    pub directive: Option<Directive>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
            directive: None,
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directive = Some(directive);
        self
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDef> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// The predicate of a `@property` field.
    pub fn property(&self) -> Option<NamedNodeRef<'_>> {
        if let Some(Directive::Property(iri)) = &self.directive {
            Some(iri.as_ref())
        } else {
            None
        }
    }
}

/// Role of an object type in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// Type generated from a shape.
    Entity,
    /// `<T>Mutation` type grouping the mutators of the entity type `T`.
    Mutator { entity: String },
    /// Query or mutation root.
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    pub name: String,
    pub kind: ObjectKind,
    pub class: Option<NamedNode>,
    pub fields: Vec<FieldDef>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Entity,
            class: None,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field of an input type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFieldDef {
    pub name: String,
    pub ty: TypeExpr,
    pub directive: Option<Directive>,
    /// Datatype of the literals written for this field.
    pub datatype: Option<NamedNode>,
}

impl InputFieldDef {
    pub fn property(&self) -> Option<NamedNodeRef<'_>> {
        if let Some(Directive::Property(iri)) = &self.directive {
            Some(iri.as_ref())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputType {
    pub name: String,
    pub class: Option<NamedNode>,
    pub fields: Vec<InputFieldDef>,
}

impl InputType {
    pub fn field(&self, name: &str) -> Option<&InputFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The generated schema: root types, entity types, mutator types and input types.
#[derive(Debug, Clone, Default)]
pub struct SchemaDefinition {
    objects: Vec<ObjectType>,
    inputs: Vec<InputType>,
}

impl SchemaDefinition {
    pub(crate) fn new(objects: Vec<ObjectType>, inputs: Vec<InputType>) -> Self {
        Self { objects, inputs }
    }

    pub fn objects(&self) -> &[ObjectType] {
        &self.objects
    }

    pub fn inputs(&self) -> &[InputType] {
        &self.inputs
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&InputType> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn query(&self) -> Option<&ObjectType> {
        self.object(QUERY_TYPE)
    }

    pub fn mutation(&self) -> Option<&ObjectType> {
        self.object(MUTATION_TYPE)
    }

    /// Object types generated from shapes.
    pub fn entities(&self) -> impl Iterator<Item = &ObjectType> {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Entity)
    }

    pub fn try_object(&self, name: &str) -> Result<&ObjectType, SchemaError> {
        self.object(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_owned()))
    }

    pub fn try_input(&self, name: &str) -> Result<&InputType, SchemaError> {
        self.input(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_owned()))
    }

    /// Class bound with `@is` to the type named `name`.
    pub fn class_of(&self, name: &str) -> Option<NamedNodeRef<'_>> {
        self.object(name)?.class.as_ref().map(NamedNode::as_ref)
    }

    /// Serializes the schema in the GraphQL schema definition language.
    pub fn sdl(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "directive @is(class: String!) on OBJECT | INPUT_OBJECT")?;
        writeln!(f)?;
        writeln!(
            f,
            "directive @property(iri: String!) on FIELD_DEFINITION | INPUT_FIELD_DEFINITION"
        )?;
        writeln!(f)?;
        writeln!(f, "directive @identifier on FIELD_DEFINITION")?;
        for object in &self.objects {
            write!(f, "\ntype {}", object.name)?;
            if let Some(class) = &object.class {
                write!(f, " {}", Directive::Class(class.clone()))?;
            }
            writeln!(f, " {{")?;
            for field in &object.fields {
                write!(f, "  {}", field.name)?;
                if !field.arguments.is_empty() {
                    f.write_char('(')?;
                    for (i, argument) in field.arguments.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}: {}", argument.name, argument.ty)?;
                    }
                    f.write_char(')')?;
                }
                write!(f, ": {}", field.ty)?;
                if let Some(directive) = &field.directive {
                    write!(f, " {directive}")?;
                }
                writeln!(f)?;
            }
            writeln!(f, "}}")?;
        }
        for input in &self.inputs {
            write!(f, "\ninput {}", input.name)?;
            if let Some(class) = &input.class {
                write!(f, " {}", Directive::Class(class.clone()))?;
            }
            writeln!(f, " {{")?;
            for field in &input.fields {
                write!(f, "  {}: {}", field.name, field.ty)?;
                if let Some(directive) = &field.directive {
                    write!(f, " {directive}")?;
                }
                writeln!(f)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
