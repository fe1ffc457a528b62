//! Productos API routes
//!
//! This module wires up the productos domain to HTTP routes.

use axum::Router;
use domain_productos::{
    LocalFileSink, MongoCategoriaRepository, MongoProductoRepository, ProductoResult,
    ProductoService, UploadConfig, handlers,
};
use mongodb::Database;

use crate::state::AppState;

/// Create productos router
pub fn router(state: &AppState) -> Router {
    let service = ProductoService::new(
        MongoProductoRepository::new(&state.db),
        MongoCategoriaRepository::new(&state.db),
    );

    handlers::router(service, state.config.uploads.clone())
}

/// Create collection indexes and the upload directory
pub async fn init(db: &Database, uploads: &UploadConfig) -> ProductoResult<()> {
    MongoProductoRepository::new(db).init_indexes().await?;
    MongoCategoriaRepository::new(db).init_indexes().await?;
    LocalFileSink::new(&uploads.path).ensure_dir().await?;
    Ok(())
}
