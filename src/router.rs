use crate::handlers::{
    companies::{
        create_company, delete_company, get_company, list_companies, patch_company, replace_company,
    },
    health::health_check,
    products::{create_product, get_product, list_company_products, list_products},
    transactions::{create_transaction, get_transaction, list_transactions},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{routing::get, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.settings.server.request_timeout_secs);

    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Companies
        .route("/api/companies", get(list_companies).post(create_company))
        .route(
            "/api/companies/:code",
            get(get_company)
                .put(replace_company)
                .patch(patch_company)
                .delete(delete_company),
        )
        // Products
        .route(
            "/api/companies/:code/products",
            get(list_company_products).post(create_product),
        )
        .route("/api/companies/:code/products/:product_code", get(get_product))
        .route("/api/products", get(list_products))
        // Transactions
        .route("/api/transactions", get(list_transactions).post(create_transaction))
        .route("/api/transactions/:code", get(get_transaction))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // The global metrics recorder can only be installed once per process,
    // so test builds run without it.
    #[cfg(not(test))]
    let router = {
        let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();
        router
            .route("/metrics", get(move || async move { metric_handle.render() }))
            .layer(prometheus_layer)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
