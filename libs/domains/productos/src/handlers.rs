//! HTTP handlers for the Productos API

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_helpers::errors::responses::{BadRequestResponse, InternalServerErrorResponse};
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::{ProductoError, ProductoResult};
use crate::models::{
    Categoria, CreatedResponse, Producto, ProductoForm, ProductoPayload, ValidationErrorBody,
};
use crate::repository::{CategoriaRepository, ProductoRepository, ProductoStream};
use crate::service::ProductoService;
use crate::storage::{FileSink, LocalFileSink, photo_filename};

/// Where the router is mounted; used for `Location` headers
pub const BASE_PATH: &str = "/api/productos";

const FILE_FIELD: &str = "file";
const FILE_REQUIRED: &str = "El campo file no puede estar vacío";

/// Photo upload settings
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory photos are written to
    pub path: PathBuf,
    /// Request body limit for every productos route
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./uploads"),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// OpenAPI documentation for Productos API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_productos,
        get_producto,
        create_producto,
        create_producto_with_foto,
        upload_foto,
        update_producto,
        delete_producto,
    ),
    components(
        schemas(
            Producto, Categoria, ProductoPayload, CreatedResponse,
            ValidationErrorBody, ProductoConFotoForm, FotoForm
        ),
        responses(BadRequestResponse, InternalServerErrorResponse)
    ),
    tags(
        (name = "Productos", description = "Product catalogue and photo uploads")
    )
)]
pub struct ApiDoc;

/// Multipart form for `POST /v2`
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
struct ProductoConFotoForm {
    nombre: String,
    precio: f64,
    /// RFC 3339 or `yyyy-MM-dd`
    #[serde(rename = "createAt")]
    create_at: Option<String>,
    #[serde(rename = "categoria.id")]
    categoria_id: Option<String>,
    #[serde(rename = "categoria.nombre")]
    categoria_nombre: Option<String>,
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Multipart form for `POST /upload/{id}`
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
struct FotoForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

struct ProductosState<P, C> {
    service: ProductoService<P, C>,
    sink: Arc<dyn FileSink>,
}

/// Create the productos router, writing photos to `upload.path`
pub fn router<P, C>(service: ProductoService<P, C>, upload: UploadConfig) -> Router
where
    P: ProductoRepository + 'static,
    C: CategoriaRepository + 'static,
{
    let sink = Arc::new(LocalFileSink::new(upload.path));
    router_with_sink(service, sink, upload.max_bytes)
}

/// Create the productos router with an explicit [`FileSink`]
pub fn router_with_sink<P, C>(
    service: ProductoService<P, C>,
    sink: Arc<dyn FileSink>,
    max_bytes: usize,
) -> Router
where
    P: ProductoRepository + 'static,
    C: CategoriaRepository + 'static,
{
    let state = Arc::new(ProductosState { service, sink });

    Router::new()
        .route("/", get(list_productos).post(create_producto))
        .route("/v2", post(create_producto_with_foto))
        .route("/upload/{id}", post(upload_foto))
        .route(
            "/{id}",
            get(get_producto)
                .put(update_producto)
                .delete(delete_producto),
        )
        .layer(DefaultBodyLimit::max(max_bytes))
        .with_state(state)
}

/// List all productos
///
/// The array is streamed element by element from the database cursor.
#[utoipa::path(
    get,
    path = "",
    tag = "Productos",
    responses(
        (status = 200, description = "All productos", body = Vec<Producto>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_productos<P: ProductoRepository + 'static, C: CategoriaRepository + 'static>(
    State(state): State<Arc<ProductosState<P, C>>>,
) -> ProductoResult<Response> {
    let productos = state.service.find_all().await?;

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(json_array(productos)),
    )
        .into_response())
}

/// Get a producto by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Productos",
    params(("id" = String, Path, description = "Producto id")),
    responses(
        (status = 200, description = "Producto found", body = Producto),
        (status = 404, description = "Producto not found, empty body"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_producto<P: ProductoRepository + 'static, C: CategoriaRepository + 'static>(
    State(state): State<Arc<ProductosState<P, C>>>,
    Path(id): Path<String>,
) -> ProductoResult<Json<Producto>> {
    let producto = find_existing(&state.service, &id).await?;
    Ok(Json(producto))
}

/// Create a producto from JSON
#[utoipa::path(
    post,
    path = "",
    tag = "Productos",
    request_body = ProductoPayload,
    responses(
        (status = 201, description = "Producto created", body = CreatedResponse,
            headers(("Location" = String, description = "Path of the new producto"))),
        (status = 400, description = "Field validation failed", body = ValidationErrorBody),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_producto<P: ProductoRepository + 'static, C: CategoriaRepository + 'static>(
    State(state): State<Arc<ProductosState<P, C>>>,
    payload: Result<Json<ProductoPayload>, JsonRejection>,
) -> ProductoResult<Response> {
    let Json(payload) = payload?;
    let mut producto = payload.into_producto()?;
    producto.stamp_create_at();

    let producto = state.service.save(producto).await?;
    let location = location(&producto)?;

    Ok(created(location, Json(CreatedResponse::new(producto))))
}

/// Create a producto together with its photo
///
/// The photo is written before the record is saved; a failed write saves nothing.
#[utoipa::path(
    post,
    path = "/v2",
    tag = "Productos",
    request_body(content = ProductoConFotoForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Producto created", body = Producto,
            headers(("Location" = String, description = "Path of the new producto"))),
        (status = 400, description = "Field validation failed", body = ValidationErrorBody),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_producto_with_foto<
    P: ProductoRepository + 'static,
    C: CategoriaRepository + 'static,
>(
    State(state): State<Arc<ProductosState<P, C>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ProductoResult<Response> {
    let upload = read_multipart(multipart?).await?;

    let (mut producto, file) = match (upload.form.into_producto(), upload.file) {
        (Ok(producto), Some(file)) => (producto, file),
        (result, file) => {
            let mut errors = match result {
                Err(ProductoError::Validation(errors)) => errors,
                Err(other) => return Err(other),
                Ok(_) => Vec::new(),
            };
            if file.is_none() {
                errors.push(FILE_REQUIRED.to_string());
                errors.sort();
            }
            return Err(ProductoError::Validation(errors));
        }
    };

    producto.stamp_create_at();
    let foto = photo_filename(&file.filename);
    state.sink.write(&foto, file.data).await?;
    producto.foto = Some(foto);

    let producto = state.service.save(producto).await?;
    let location = location(&producto)?;

    Ok(created(location, Json(producto)))
}

/// Attach a photo to an existing producto
#[utoipa::path(
    post,
    path = "/upload/{id}",
    tag = "Productos",
    params(("id" = String, Path, description = "Producto id")),
    request_body(content = FotoForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Photo stored", body = Producto),
        (status = 400, description = "No file part", body = ValidationErrorBody),
        (status = 404, description = "Producto not found, empty body"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn upload_foto<P: ProductoRepository + 'static, C: CategoriaRepository + 'static>(
    State(state): State<Arc<ProductosState<P, C>>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ProductoResult<Json<Producto>> {
    let mut producto = find_existing(&state.service, &id).await?;

    let file = read_multipart(multipart?)
        .await?
        .file
        .ok_or_else(|| ProductoError::Validation(vec![FILE_REQUIRED.to_string()]))?;

    let foto = photo_filename(&file.filename);
    state.sink.write(&foto, file.data).await?;
    producto.foto = Some(foto);

    Ok(Json(state.service.save(producto).await?))
}

/// Replace name, price and category of a producto
///
/// The body is applied as sent, without the create validation. An unknown
/// id is a 404 whatever the body. Answers 201 with a `Location`, like create.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Productos",
    params(("id" = String, Path, description = "Producto id")),
    request_body = ProductoPayload,
    responses(
        (status = 201, description = "Producto updated", body = Producto,
            headers(("Location" = String, description = "Path of the producto"))),
        (status = 400, description = "Malformed JSON body"),
        (status = 404, description = "Producto not found, empty body"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_producto<P: ProductoRepository + 'static, C: CategoriaRepository + 'static>(
    State(state): State<Arc<ProductosState<P, C>>>,
    Path(id): Path<String>,
    payload: Result<Json<ProductoPayload>, JsonRejection>,
) -> ProductoResult<Response> {
    let mut producto = find_existing(&state.service, &id).await?;

    let Json(changes) = payload?;
    producto.apply_edit(changes);

    let producto = state.service.save(producto).await?;
    let location = location(&producto)?;

    Ok(created(location, Json(producto)))
}

/// Delete a producto
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Productos",
    params(("id" = String, Path, description = "Producto id")),
    responses(
        (status = 204, description = "Producto deleted"),
        (status = 404, description = "Producto not found, empty body"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_producto<P: ProductoRepository + 'static, C: CategoriaRepository + 'static>(
    State(state): State<Arc<ProductosState<P, C>>>,
    Path(id): Path<String>,
) -> ProductoResult<StatusCode> {
    let producto = find_existing(&state.service, &id).await?;
    state.service.delete(&producto).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_existing<P, C>(service: &ProductoService<P, C>, id: &str) -> ProductoResult<Producto>
where
    P: ProductoRepository + 'static,
    C: CategoriaRepository + 'static,
{
    service
        .find_by_id(id)
        .await?
        .ok_or_else(|| ProductoError::NotFound(id.to_string()))
}

fn location(producto: &Producto) -> ProductoResult<String> {
    producto
        .id
        .as_deref()
        .map(|id| format!("{BASE_PATH}/{id}"))
        .ok_or_else(|| ProductoError::Internal("saved producto has no id".to_string()))
}

fn created(location: String, body: impl IntoResponse) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], body).into_response()
}

/// `[`, the comma-separated elements, `]`. A failing element ends the body with an error.
fn json_array(
    productos: ProductoStream,
) -> impl Stream<Item = Result<Bytes, ProductoError>> + Send + 'static {
    let elements = productos.enumerate().map(|(index, item)| {
        let producto = item.inspect_err(|e| {
            tracing::error!(error = %e, index, "Producto stream failed mid-response");
        })?;

        let mut chunk = if index == 0 { Vec::new() } else { vec![b','] };
        serde_json::to_writer(&mut chunk, &producto)
            .map_err(|e| ProductoError::Internal(e.to_string()))?;
        Ok(Bytes::from(chunk))
    });

    stream::once(async { Ok(Bytes::from_static(b"[")) })
        .chain(elements)
        .chain(stream::once(async { Ok(Bytes::from_static(b"]")) }))
}

struct UploadedFile {
    filename: String,
    data: Bytes,
}

struct MultipartUpload {
    form: ProductoForm,
    file: Option<UploadedFile>,
}

/// Buffer every part. An empty, unnamed file part counts as no file.
async fn read_multipart(mut multipart: Multipart) -> ProductoResult<MultipartUpload> {
    let mut upload = MultipartUpload {
        form: ProductoForm::default(),
        file: None,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            if !(filename.is_empty() && data.is_empty()) {
                upload.file = Some(UploadedFile { filename, data });
            }
        } else {
            let value = field.text().await?;
            if !upload.form.set(&name, value) {
                tracing::debug!(field = %name, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(upload)
}
