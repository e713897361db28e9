// Core modules: request/response model, operation catalog, wire codecs and errors.
pub mod catalog;
pub mod error;
pub mod node;
pub mod operation;
pub mod request;
pub mod response;
pub mod shape;
pub mod target;
pub mod version;
pub mod wire;
