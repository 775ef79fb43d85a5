use axum::Router;
use utoipa::openapi::{
    OpenApi,
    security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::app::middleware::STAFF_ID_HEADER;

/// Name of the security scheme referenced by staff-only routes.
pub const STAFF_SECURITY_SCHEME: &str = "staffId";

/// Registers the staff header scheme and mounts Swagger UI next to the JSON document.
pub fn create_swagger_ui<S>(mut openapi: OpenApi) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        STAFF_SECURITY_SCHEME,
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(STAFF_ID_HEADER))),
    );

    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", openapi)
        .into()
}
