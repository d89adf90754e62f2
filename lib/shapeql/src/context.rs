//! Index over a full shapes graph and memoization of the generated types.

use crate::error::ShapeError;
use crate::graph::TripleStore;
use crate::schema::{InputType, ObjectType};
use crate::shape::Shape;
use crate::vocab::{rdf, shacl};
use oxrdf::{NamedNode, NamedNodeRef, Subject, Triple, TripleRef};
use oxttl::TurtleParser;
use rustc_hash::FxHashMap;
use std::io::Read;
use tracing::debug;

/// All the shapes of a shapes graph.
///
/// Generated object and input types are memoized by name,
/// so a type with a given name is generated at most once per context.
#[derive(Debug)]
pub struct ShapeContext {
    triples: TripleStore,
    blank_nodes: TripleStore,
    shapes: Vec<Shape>,
    shape_by_class: FxHashMap<NamedNode, usize>,
    object_types: FxHashMap<String, ObjectType>,
    input_types: FxHashMap<String, InputType>,
}

impl ShapeContext {
    /// Compiles the shapes of a set of triples.
    pub fn new(triples: impl IntoIterator<Item = Triple>) -> Result<Self, ShapeError> {
        let triples: TripleStore = triples.into_iter().collect();
        let blank_nodes: TripleStore = triples
            .iter()
            .filter(|t| t.subject.is_blank_node())
            .map(TripleRef::into_owned)
            .collect();
        let mut shapes = Vec::new();
        let shape_subjects: Vec<Subject> = triples
            .find(None, Some(rdf::TYPE), Some(shacl::NODE_SHAPE.into()))
            .into_iter()
            .map(|t| t.subject)
            .collect();
        for subject in shape_subjects {
            let group = triples.find(Some(subject.as_ref()), None, None);
            let shape = Shape::from_triples(&group, &blank_nodes)?;
            debug!("Compiled shape {} from {}", shape.name(), shape.id());
            shapes.push(shape);
        }
        // Deterministic output whatever the triple order is
        shapes.sort_by(|a, b| a.name().cmp(b.name()));
        let mut shape_by_class = FxHashMap::default();
        for (i, shape) in shapes.iter().enumerate() {
            if let Some(class) = shape.target_class() {
                shape_by_class.entry(class.into_owned()).or_insert(i);
            }
        }
        Ok(Self {
            triples,
            blank_nodes,
            shapes,
            shape_by_class,
            object_types: FxHashMap::default(),
            input_types: FxHashMap::default(),
        })
    }

    /// Parses Turtle shape declarations and compiles them.
    pub fn from_turtle(reader: impl Read, base_iri: Option<&str>) -> Result<Self, ShapeError> {
        let mut parser = TurtleParser::new();
        if let Some(base_iri) = base_iri {
            parser = parser.with_base_iri(base_iri)?;
        }
        let triples = parser
            .for_reader(reader)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(triples)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.name() == name)
    }

    /// Returns the shape whose `sh:targetClass` is `class`.
    pub fn shape_for_class(&self, class: NamedNodeRef<'_>) -> Option<&Shape> {
        self.shape_by_class
            .get(&class.into_owned())
            .map(|i| &self.shapes[*i])
    }

    /// All the triples of the shapes graph.
    pub fn triples(&self) -> &TripleStore {
        &self.triples
    }

    /// The triples whose subject is a blank node.
    pub fn blank_nodes(&self) -> &TripleStore {
        &self.blank_nodes
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.object_types.get(name)
    }

    pub fn input_type(&self, name: &str) -> Option<&InputType> {
        self.input_types.get(name)
    }

    /// Returns the object type named `name`, building it with `build` on first access.
    pub(crate) fn memoize_object_type<E>(
        &mut self,
        name: &str,
        build: impl FnOnce(&Self) -> Result<ObjectType, E>,
    ) -> Result<&ObjectType, E> {
        if !self.object_types.contains_key(name) {
            let object_type = build(self)?;
            debug!("Generated object type {name}");
            self.object_types.insert(name.to_owned(), object_type);
        }
        Ok(&self.object_types[name])
    }

    /// Returns the input type named `name`, building it with `build` on first access.
    pub(crate) fn memoize_input_type<E>(
        &mut self,
        name: &str,
        build: impl FnOnce(&Self) -> Result<InputType, E>,
    ) -> Result<&InputType, E> {
        if !self.input_types.contains_key(name) {
            let input_type = build(self)?;
            debug!("Generated input type {name}");
            self.input_types.insert(name.to_owned(), input_type);
        }
        Ok(&self.input_types[name])
    }
}
