//! Error types for shape compilation, schema generation and field resolution.

use oxrdf::{NamedNode, Term};
use std::io;

/// Error raised while compiling shape declarations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShapeError {
    /// A group of shape triples does not assert any `sh:NodeShape` subject.
    #[error("No sh:NodeShape subject found in shape declaration")]
    MissingNodeShape,

    /// A group of shape triples asserts several `sh:NodeShape` subjects.
    #[error("Shape declaration has {count} sh:NodeShape subjects, expected exactly one")]
    AmbiguousNodeShape { count: usize },

    /// The shape declarations are not valid Turtle.
    #[error(transparent)]
    Parse(#[from] oxttl::TurtleParseError),

    /// The base IRI given to the parser is invalid.
    #[error(transparent)]
    InvalidBaseIri(#[from] oxiri::IriParseError),
}

/// Error raised while building the typed schema.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// A field whose type is not a scalar was used inside a mutation input type.
    #[error("Field {field} of type {type_name} can not be used as a mutation input")]
    NonScalarInput { field: String, type_name: String },

    /// A type referenced by name has never been generated.
    #[error("Unknown type {0}")]
    UnknownType(String),

    /// The typed-query engine rejected the generated schema.
    #[error("Invalid generated schema: {0}")]
    Engine(String),
}

/// Error returned by an [`LdpClient`](crate::LdpClient).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server answered with a non-success status code.
    #[error("Error {status} returned by {url} with payload:\n{body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    /// Network or I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The returned document could not be parsed as RDF.
    #[error("Invalid RDF returned by {url}: {message}")]
    Parse { url: String, message: String },

    /// The URL is not a valid absolute IRI.
    #[error("Invalid resource URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The blocking task running the request could not complete.
    #[error("Transport task failed: {0}")]
    Task(String),
}

impl TransportError {
    /// Creates an HTTP status error.
    pub fn http(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a "not found" error.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::http(url, 404, "Not Found")
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Returns the HTTP status code if the server answered.
    pub fn status(&self) -> Option<u16> {
        if let Self::Http { status, .. } = self {
            Some(*status)
        } else {
            None
        }
    }
}

/// Error raised while resolving a field.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// The target resolver does not know where instances of a class are stored.
    #[error("No target resource known for class {class}")]
    NoTarget { class: NamedNode },

    /// A type has no `@is` class binding.
    #[error("Type {type_name} is not bound to any class")]
    MissingClass { type_name: String },

    /// An update tried to set a non-nullable field to null.
    #[error("Field {field} of {type_name} is non-nullable and can not be set to null")]
    NullOnNonNullable { type_name: String, field: String },

    /// An argument is missing or has an unexpected shape.
    #[error("Invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    /// A create would overwrite an existing resource.
    #[error("The resource {url} already exists")]
    AlreadyExists { url: String },

    /// A value could not be turned into an RDF term.
    #[error("Invalid value for {property}: {message}")]
    InvalidValue { property: NamedNode, message: String },

    /// The field needs a parent entity but none was resolved.
    #[error("Field {field} requires a resolved parent entity")]
    MissingContext { field: String },

    /// The entity to mutate is not a named resource.
    #[error("{0} is not a named resource")]
    NotNamed(Term),

    /// The schema metadata needed by the field is missing.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The remote store failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ResolveError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(property: impl Into<NamedNode>, message: impl ToString) -> Self {
        Self::InvalidValue {
            property: property.into(),
            message: message.to_string(),
        }
    }

    /// Creates a missing context error.
    pub fn missing_context(field: impl Into<String>) -> Self {
        Self::MissingContext {
            field: field.into(),
        }
    }

    /// Returns true if the error was raised before reaching the remote store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NullOnNonNullable { .. }
                | Self::InvalidArgument { .. }
                | Self::InvalidValue { .. }
                | Self::AlreadyExists { .. }
        )
    }
}

/// Error raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An IRI or URL of the configuration is not valid.
    #[error("Invalid IRI {iri} in configuration: {message}")]
    InvalidIri { iri: String, message: String },
}
