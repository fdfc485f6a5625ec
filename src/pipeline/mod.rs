//! Fetch → validate → reduce orchestration and its two collaborators.

mod client;
mod handler;
mod http;
mod validator;

pub use client::{ClientServer, FetchError, FetchSpec, HttpMethod, records_from_json};
pub use handler::{MachineDataHandler, Pipeline, PipelineError, PipelineJob};
pub use http::HttpClient;
pub use validator::{FieldKind, FieldSpec, SchemaValidator, StructureSpec, Validator, Violation};

#[cfg(test)]
mod http_test;
