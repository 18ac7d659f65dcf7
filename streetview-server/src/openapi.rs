//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json`.

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::HealthResponse;

/// Street View Image API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Street View Image API",
        version = "0.1.0",
        description = r#"
## Street-level imagery by coordinate

Returns the Street View photo for a latitude/longitude pair.

- Images are cached for 1337 hours, keyed purely by coordinates
- A free metadata check runs before every billable image request
- Every request carries a version-4 UUID in `x-correlation-id`

### Error codes

| HTTP | `code` | Meaning |
|------|--------|---------|
| 400 | `INVALID_ARGUMENT` | Missing/invalid correlation id or malformed coordinates |
| 404 | `NOT_FOUND` | No imagery at these coordinates |
| 500 | `UNKNOWN` | Anything else; retry later |
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development server")
    ),
    tags(
        (name = "Street View", description = "Street-level image retrieval"),
        (name = "Health", description = "Service health endpoint")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::image::street_view_handler,
    ),
    components(schemas(HealthResponse))
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
