//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for all APIs
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Productos API",
        version = "0.1.0",
        description = "Product catalogue over MongoDB with photo uploads",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/productos", api = domain_productos::ApiDoc)
    ),
    tags(
        (name = "Productos", description = "Product catalogue and photo uploads")
    )
)]
pub struct ApiDoc;
