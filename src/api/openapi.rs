//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time with utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the snapshot-publisher REST API
///
/// Served as JSON at `/openapi.json` and, when enabled, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "snapshot-publisher REST API",
        version = "0.1.0",
        description = "Trigger paged snapshot publishing of registered channels and follow run progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Publishing
        crate::api::routes::upload_all,
        crate::api::routes::upload_selected,
        crate::api::routes::available_channels,

        // Processes
        crate::api::routes::list_processes,
        crate::api::routes::get_process,
        crate::api::routes::cancel_process,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::RunId,
        crate::types::ProcessStatus,
        crate::types::ProcessInfo,
        crate::types::Priority,
        crate::types::Event,

        crate::config::Config,
        crate::config::PublishConfig,
        crate::config::PersistenceConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        crate::api::routes::CancelResponse,
        crate::api::routes::HealthResponse,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "publish", description = "Start publish runs over all or selected channels"),
        (name = "processes", description = "Follow and cancel publish runs"),
        (name = "system", description = "Health check, OpenAPI document and event stream"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `X-Api-Key` header scheme
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
