//! Producto Service - pass-through façade over the repositories

use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tracing::instrument;

use crate::error::ProductoResult;
use crate::models::{Categoria, Producto};
use crate::repository::{CategoriaRepository, ProductoRepository, ProductoStream};

/// Delegates every call to the repositories. Cloning shares them.
pub struct ProductoService<P, C> {
    productos: Arc<P>,
    categorias: Arc<C>,
}

impl<P, C> Clone for ProductoService<P, C> {
    fn clone(&self) -> Self {
        Self {
            productos: Arc::clone(&self.productos),
            categorias: Arc::clone(&self.categorias),
        }
    }
}

impl<P, C> ProductoService<P, C>
where
    P: ProductoRepository + 'static,
    C: CategoriaRepository + 'static,
{
    pub fn new(productos: P, categorias: C) -> Self {
        Self {
            productos: Arc::new(productos),
            categorias: Arc::new(categorias),
        }
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> ProductoResult<ProductoStream> {
        self.productos.find_all().await
    }

    /// Every product with its name upper-cased
    #[instrument(skip(self))]
    pub async fn find_all_upper_case(&self) -> ProductoResult<ProductoStream> {
        let productos = self.productos.find_all().await?;
        Ok(productos.map_ok(Producto::with_nombre_upper_case).boxed())
    }

    /// [`find_all_upper_case`](Self::find_all_upper_case) followed by a second
    /// pass over a fresh cursor, opened only once the first pass is drained
    #[instrument(skip(self))]
    pub async fn find_all_upper_case_repeat(&self) -> ProductoResult<ProductoStream> {
        let first = self.find_all_upper_case().await?;
        let repository = Arc::clone(&self.productos);

        let second = stream::once(async move { repository.find_all().await })
            .try_flatten()
            .map_ok(Producto::with_nombre_upper_case);

        Ok(first.chain(second).boxed())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> ProductoResult<Option<Producto>> {
        self.productos.find_by_id(id).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_nombre(&self, nombre: &str) -> ProductoResult<Option<Producto>> {
        self.productos.find_by_nombre(nombre).await
    }

    #[instrument(skip(self, producto), fields(nombre = %producto.nombre))]
    pub async fn save(&self, producto: Producto) -> ProductoResult<Producto> {
        self.productos.save(producto).await
    }

    #[instrument(skip(self, producto), fields(producto_id = ?producto.id))]
    pub async fn delete(&self, producto: &Producto) -> ProductoResult<()> {
        self.productos.delete(producto).await
    }

    #[instrument(skip(self))]
    pub async fn find_all_categorias(&self) -> ProductoResult<ProductoStream<Categoria>> {
        self.categorias.find_all().await
    }

    #[instrument(skip(self))]
    pub async fn find_categoria_by_id(&self, id: &str) -> ProductoResult<Option<Categoria>> {
        self.categorias.find_by_id(id).await
    }

    #[instrument(skip(self))]
    pub async fn find_categoria_by_nombre(
        &self,
        nombre: &str,
    ) -> ProductoResult<Option<Categoria>> {
        self.categorias.find_by_nombre(nombre).await
    }

    #[instrument(skip(self, categoria), fields(nombre = %categoria.nombre))]
    pub async fn save_categoria(&self, categoria: Categoria) -> ProductoResult<Categoria> {
        self.categorias.save(categoria).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProductoError;
    use crate::repository::{MockCategoriaRepository, MockProductoRepository};

    fn producto(id: &str, nombre: &str) -> Producto {
        let mut p = Producto::new(nombre, 10.0, None);
        p.id = Some(id.to_string());
        p
    }

    fn stream_of(items: Vec<Producto>) -> ProductoStream {
        stream::iter(items.into_iter().map(Ok)).boxed()
    }

    fn service(
        productos: MockProductoRepository,
    ) -> ProductoService<MockProductoRepository, MockCategoriaRepository> {
        ProductoService::new(productos, MockCategoriaRepository::new())
    }

    #[tokio::test]
    async fn test_find_by_id_delegates() {
        let mut mock = MockProductoRepository::new();
        mock.expect_find_by_id()
            .withf(|id| id == "p1")
            .times(1)
            .returning(|id| Ok(Some(producto(id, "Apple iPod"))));

        let found = service(mock).find_by_id("p1").await.unwrap().unwrap();
        assert_eq!(found.nombre, "Apple iPod");
    }

    #[tokio::test]
    async fn test_find_by_id_absent() {
        let mut mock = MockProductoRepository::new();
        mock.expect_find_by_id().returning(|_| Ok(None));

        assert!(service(mock).find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_passes_record_through() {
        let mut mock = MockProductoRepository::new();
        mock.expect_save()
            .withf(|p| p.nombre == "Mesa comedor" && p.id.is_none())
            .times(1)
            .returning(|mut p| {
                p.id = Some("new-id".into());
                Ok(p)
            });

        let saved = service(mock)
            .save(Producto::new("Mesa comedor", 100.0, None))
            .await
            .unwrap();
        assert_eq!(saved.id.as_deref(), Some("new-id"));
    }

    #[tokio::test]
    async fn test_delete_propagates_errors() {
        let mut mock = MockProductoRepository::new();
        mock.expect_delete()
            .times(1)
            .returning(|_| Err(ProductoError::Database("connection reset".into())));

        let err = service(mock)
            .delete(&producto("p1", "Apple iPod"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductoError::Database(_)));
    }

    #[tokio::test]
    async fn test_find_all_upper_case() {
        let mut mock = MockProductoRepository::new();
        mock.expect_find_all().times(1).returning(|| {
            Ok(stream_of(vec![
                producto("1", "Apple iPod"),
                producto("2", "Mica Cómoda 5 Cajones"),
            ]))
        });

        let nombres: Vec<String> = service(mock)
            .find_all_upper_case()
            .await
            .unwrap()
            .map_ok(|p| p.nombre)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(nombres, vec!["APPLE IPOD", "MICA CÓMODA 5 CAJONES"]);
    }

    #[tokio::test]
    async fn test_find_all_upper_case_repeat_reopens_cursor() {
        let mut mock = MockProductoRepository::new();
        mock.expect_find_all()
            .times(2)
            .returning(|| Ok(stream_of(vec![producto("1", "Sony Notebook")])));

        let nombres: Vec<String> = service(mock)
            .find_all_upper_case_repeat()
            .await
            .unwrap()
            .map_ok(|p| p.nombre)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(nombres, vec!["SONY NOTEBOOK", "SONY NOTEBOOK"]);
    }

    #[tokio::test]
    async fn test_categoria_lookups_delegate() {
        let mut categorias = MockCategoriaRepository::new();
        categorias
            .expect_find_by_nombre()
            .withf(|nombre| nombre == "Muebles")
            .returning(|nombre| {
                Ok(Some(Categoria {
                    id: Some("c1".into()),
                    nombre: nombre.to_string(),
                }))
            });
        categorias
            .expect_save()
            .returning(|mut c| {
                c.id = Some("c2".into());
                Ok(c)
            });

        let service = ProductoService::new(MockProductoRepository::new(), categorias);

        let muebles = service.find_categoria_by_nombre("Muebles").await.unwrap();
        assert_eq!(muebles.unwrap().id.as_deref(), Some("c1"));

        let deporte = service.save_categoria(Categoria::new("Deporte")).await.unwrap();
        assert_eq!(deporte.id.as_deref(), Some("c2"));
    }
}
