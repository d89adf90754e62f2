#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod context;
mod dynamic;
mod error;
mod generator;
mod graph;
#[cfg(feature = "http-client")]
mod http;
mod memory;
mod resolve;
mod schema;
mod shape;
mod target;
mod transport;
pub mod vocab;

pub use config::{Config, HttpConfig};
pub use context::ShapeContext;
pub use dynamic::build_schema;
pub use error::{ConfigError, ResolveError, SchemaError, ShapeError, TransportError};
pub use generator::{IDENTIFIER_FIELD, INPUT_ARGUMENT, SLUG_FIELD, SchemaGenerator};
pub use graph::{GraphHandle, TripleStore};
#[cfg(feature = "http-client")]
pub use http::HttpLdpClient;
pub use memory::{Call, MemoryLdpClient};
pub use resolve::{
    FieldRequest, Resolved, ResolutionContext, Resolver, canonical_identifier, parse_identifier,
    textual_identifier,
};
pub use schema::{
    ArgumentDef, Directive, FieldDef, ID_TYPE, InputFieldDef, InputType, MUTATION_TYPE,
    ObjectKind, ObjectType, QUERY_TYPE, SchemaDefinition, TypeExpr,
};
pub use shape::{PropertyKind, PropertyShape, RelationRef, ScalarType, Shape};
pub use target::{StaticTargetResolver, TargetResolver};
pub use transport::{LdpClient, Patch, ResourceKind, document_url};
