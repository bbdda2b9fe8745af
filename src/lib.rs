//! # Resource Directory
//!
//! A directory service for mental-health resources. An administrator
//! maintains a catalogue of entries; visitors browse and filter it, either
//! by category/urgency dropdowns or with a free-text search that is triaged
//! into a category.
//!
//! ## Features
//!
//! - **Catalogue**: create, update, delete and list resources, newest first
//! - **Search Triage**: free text mapped to a category by an external
//!   language model, keyword rules, or plain substring search
//! - **Graceful Degradation**: model failures fall back to substring search
//!   with an apology message instead of an error
//! - **Storage**: in-memory collection with optional sled persistence
//! - **Admin Sessions**: configured credential, bearer tokens with expiry
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   HTTP Client   │    │ Query Interpreter│    │ Resource Store  │
//! │                 │    │                  │    │                 │
//! │ • browse/search │◄──►│ • dropdown filter│◄──►│ • In-Memory Map │
//! │ • admin CRUD    │    │ • Classifier     │    │ • Sled (opt)    │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod classifier;
pub mod error;
pub mod model;
pub mod query;
pub mod resource;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

pub use classifier::{
    ClassificationResult, Classifier, ClassifierConfig, ClassifierMode, KeywordClassifier,
    SemanticClassifier,
};
pub use error::{DirectoryError, Result};
pub use query::{ListParams, QueryFilter, QueryInterpreter};
pub use resource::{Category, Resource, ResourceDraft, ResourceId, ResourcePatch, Urgency};
#[cfg(feature = "server")]
pub use server::{DirectoryServer, ServerConfig};
pub use storage::{ResourceStore, StorageConfig};
