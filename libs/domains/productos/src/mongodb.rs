//! MongoDB implementations of ProductoRepository and CategoriaRepository
//!
//! Records are stored with a string `_id` holding a hex ObjectId. The wire
//! models call it `id`, so each collection goes through a private document
//! type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, doc, oid::ObjectId},
    options::IndexOptions,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ProductoError, ProductoResult};
use crate::models::{Categoria, Producto};
use crate::repository::{CategoriaRepository, ProductoRepository, ProductoStream};

pub const PRODUCTOS_COLLECTION: &str = "productos";
pub const CATEGORIAS_COLLECTION: &str = "categorias";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CategoriaDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    nombre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProductoDocument {
    #[serde(rename = "_id")]
    id: String,
    nombre: String,
    precio: f64,
    #[serde(rename = "createAt", default, skip_serializing_if = "Option::is_none")]
    create_at: Option<bson::DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    foto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    categoria: Option<CategoriaDocument>,
}

impl From<Categoria> for CategoriaDocument {
    fn from(c: Categoria) -> Self {
        Self {
            id: c.id,
            nombre: c.nombre,
        }
    }
}

impl From<CategoriaDocument> for Categoria {
    fn from(d: CategoriaDocument) -> Self {
        Self {
            id: d.id,
            nombre: d.nombre,
        }
    }
}

impl ProductoDocument {
    fn new(id: String, p: Producto) -> Self {
        Self {
            id,
            nombre: p.nombre,
            precio: p.precio,
            create_at: p
                .create_at
                .map(|t| bson::DateTime::from_millis(t.timestamp_millis())),
            foto: p.foto,
            categoria: p.categoria.map(Into::into),
        }
    }
}

impl From<ProductoDocument> for Producto {
    fn from(d: ProductoDocument) -> Self {
        Self {
            id: Some(d.id),
            nombre: d.nombre,
            precio: d.precio,
            create_at: d
                .create_at
                .and_then(|t| DateTime::<Utc>::from_timestamp_millis(t.timestamp_millis())),
            foto: d.foto,
            categoria: d.categoria.map(Into::into),
        }
    }
}

fn new_id() -> String {
    ObjectId::new().to_hex()
}

fn nombre_index(name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "nombre": 1 })
        .options(IndexOptions::builder().name(name.to_string()).build())
        .build()
}

/// MongoDB implementation of the ProductoRepository
#[derive(Clone)]
pub struct MongoProductoRepository {
    collection: Collection<ProductoDocument>,
}

impl MongoProductoRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, PRODUCTOS_COLLECTION)
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection(collection_name),
        }
    }

    /// Non-unique index backing lookups by name
    pub async fn init_indexes(&self) -> ProductoResult<()> {
        self.collection
            .create_index(nombre_index("idx_productos_nombre"))
            .await?;
        tracing::info!("Producto indexes created successfully");
        Ok(())
    }

    /// Drop the whole collection
    pub async fn drop_all(&self) -> ProductoResult<()> {
        self.collection.drop().await?;
        Ok(())
    }
}

#[async_trait]
impl ProductoRepository for MongoProductoRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> ProductoResult<ProductoStream> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor
            .map_ok(Producto::from)
            .map_err(ProductoError::from)
            .boxed())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> ProductoResult<Option<Producto>> {
        let found = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(found.map(Producto::from))
    }

    #[instrument(skip(self))]
    async fn find_by_nombre(&self, nombre: &str) -> ProductoResult<Option<Producto>> {
        let found = self.collection.find_one(doc! { "nombre": nombre }).await?;
        Ok(found.map(Producto::from))
    }

    #[instrument(skip(self, producto), fields(producto_id = ?producto.id, nombre = %producto.nombre))]
    async fn save(&self, mut producto: Producto) -> ProductoResult<Producto> {
        let id = producto.id.take().unwrap_or_else(new_id);
        let document = ProductoDocument::new(id.clone(), producto);

        self.collection
            .replace_one(doc! { "_id": id.as_str() }, &document)
            .upsert(true)
            .await?;

        tracing::info!(producto_id = %id, foto = ?document.foto, "Producto saved");
        Ok(document.into())
    }

    #[instrument(skip(self, producto), fields(producto_id = ?producto.id))]
    async fn delete(&self, producto: &Producto) -> ProductoResult<()> {
        let Some(id) = producto.id.as_deref() else {
            return Ok(());
        };

        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        tracing::info!(producto_id = %id, deleted = result.deleted_count, "Producto deleted");
        Ok(())
    }
}

/// MongoDB implementation of the CategoriaRepository
#[derive(Clone)]
pub struct MongoCategoriaRepository {
    collection: Collection<CategoriaDocument>,
}

impl MongoCategoriaRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, CATEGORIAS_COLLECTION)
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection(collection_name),
        }
    }

    pub async fn init_indexes(&self) -> ProductoResult<()> {
        self.collection
            .create_index(nombre_index("idx_categorias_nombre"))
            .await?;
        tracing::info!("Categoria indexes created successfully");
        Ok(())
    }

    pub async fn drop_all(&self) -> ProductoResult<()> {
        self.collection.drop().await?;
        Ok(())
    }
}

#[async_trait]
impl CategoriaRepository for MongoCategoriaRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> ProductoResult<ProductoStream<Categoria>> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor
            .map_ok(Categoria::from)
            .map_err(ProductoError::from)
            .boxed())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> ProductoResult<Option<Categoria>> {
        let found = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(found.map(Categoria::from))
    }

    #[instrument(skip(self))]
    async fn find_by_nombre(&self, nombre: &str) -> ProductoResult<Option<Categoria>> {
        let found = self.collection.find_one(doc! { "nombre": nombre }).await?;
        Ok(found.map(Categoria::from))
    }

    #[instrument(skip(self, categoria), fields(nombre = %categoria.nombre))]
    async fn save(&self, mut categoria: Categoria) -> ProductoResult<Categoria> {
        let id = categoria.id.take().unwrap_or_else(new_id);
        let document = CategoriaDocument {
            id: Some(id.clone()),
            nombre: categoria.nombre,
        };

        self.collection
            .replace_one(doc! { "_id": id.as_str() }, &document)
            .upsert(true)
            .await?;

        tracing::info!(categoria_id = %id, "Categoria saved");
        Ok(document.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_document_roundtrip_keeps_millis() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let mut producto = Producto::new("Apple iPod", 46.89, Some(Categoria::new("Electrónico")));
        producto.create_at = Some(created);

        let document = ProductoDocument::new("65f0c0ffee".into(), producto);
        let bson = bson::to_document(&document).unwrap();
        assert_eq!(bson.get_str("_id").unwrap(), "65f0c0ffee");
        assert!(bson.get_datetime("createAt").is_ok());
        assert!(bson.get_document("categoria").unwrap().get("_id").is_none());

        let back: Producto = bson::from_document::<ProductoDocument>(bson).unwrap().into();
        assert_eq!(back.id.as_deref(), Some("65f0c0ffee"));
        assert_eq!(back.create_at, Some(created));
        assert_eq!(back.categoria.unwrap().nombre, "Electrónico");
    }

    #[test]
    fn test_new_id_is_object_id_hex() {
        let id = new_id();
        assert_eq!(id.len(), 24);
        assert!(ObjectId::parse_str(&id).is_ok());
    }
}
