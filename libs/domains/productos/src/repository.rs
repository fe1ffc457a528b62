use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ProductoResult;
use crate::models::{Categoria, Producto};

/// Lazy sequence of records; each call to a `find_all` opens a fresh cursor
pub type ProductoStream<T = Producto> = BoxStream<'static, ProductoResult<T>>;

/// Repository trait for Producto persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductoRepository: Send + Sync {
    /// Stream every product in natural order
    async fn find_all(&self) -> ProductoResult<ProductoStream>;

    /// Get a product by id. Unknown and malformed ids both yield `None`
    async fn find_by_id(&self, id: &str) -> ProductoResult<Option<Producto>>;

    /// First product with exactly this name
    async fn find_by_nombre(&self, nombre: &str) -> ProductoResult<Option<Producto>>;

    /// Insert or replace. A record without id gets a fresh one
    async fn save(&self, producto: Producto) -> ProductoResult<Producto>;

    /// Remove the record with the product's id, if any
    async fn delete(&self, producto: &Producto) -> ProductoResult<()>;
}

/// Repository trait for Categoria persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoriaRepository: Send + Sync {
    async fn find_all(&self) -> ProductoResult<ProductoStream<Categoria>>;

    async fn find_by_id(&self, id: &str) -> ProductoResult<Option<Categoria>>;

    async fn find_by_nombre(&self, nombre: &str) -> ProductoResult<Option<Categoria>>;

    async fn save(&self, categoria: Categoria) -> ProductoResult<Categoria>;
}
