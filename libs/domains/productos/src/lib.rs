//! Productos Domain
//!
//! Products and categories stored in MongoDB, with photo uploads written to
//! a [`FileSink`](storage::FileSink) before the record is persisted.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, payload validation, response shapes
//! └──────┬──────┘
//!        │            ┌─────────────┐
//!        ├───────────▶│  FileSink   │  ← photo bytes to disk
//!        │            └─────────────┘
//! ┌──────▼──────┐
//! │   Service   │  ← pass-through façade over both repositories
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (traits + MongoDB implementations)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, request payloads, response bodies
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_productos::{
//!     handlers::{self, UploadConfig},
//!     mongodb::{MongoCategoriaRepository, MongoProductoRepository},
//!     service::ProductoService,
//! };
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("productos");
//!
//! let service = ProductoService::new(
//!     MongoProductoRepository::new(&db),
//!     MongoCategoriaRepository::new(&db),
//! );
//!
//! let router = handlers::router(service, UploadConfig::default());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;
pub mod storage;

pub use error::{ProductoError, ProductoResult};
pub use handlers::{ApiDoc, UploadConfig};
pub use models::{
    Categoria, CreatedResponse, Producto, ProductoForm, ProductoPayload, ValidationErrorBody,
};
pub use crate::mongodb::{MongoCategoriaRepository, MongoProductoRepository};
pub use repository::{CategoriaRepository, ProductoRepository, ProductoStream};
pub use service::ProductoService;
pub use storage::{FileSink, LocalFileSink, photo_filename};
