// src/main.rs

use axum::{
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_middleware;

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let app_state = AppState::new()
        .await
        .expect("No se pudo inicializar el estado de la aplicación.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("No se pudieron correr las migraciones de la base de datos.");

    tracing::info!("migraciones de la base de datos ejecutadas");

    let sales_routes = Router::new()
        .route(
            "/",
            post(handlers::sales::create_sale).get(handlers::sales::list_sales),
        )
        // Las rutas estáticas van antes que {id} y tienen prioridad.
        .route("/check-delivery", post(handlers::sales::check_delivery))
        .route("/statistics", get(handlers::statistics::get_statistics))
        .route(
            "/{id}",
            get(handlers::sales::get_sale)
                .put(handlers::sales::update_sale)
                .delete(handlers::sales::delete_sale),
        )
        .route("/{id}/cancel", post(handlers::sales::cancel_sale))
        .route(
            "/{id}/mark-as-delivered",
            post(handlers::sales::mark_as_delivered),
        )
        .route(
            "/{id}/mark-as-charged",
            post(handlers::sales::mark_as_charged),
        )
        .route(
            "/{id}/mark-as-partially-charged",
            post(handlers::sales::mark_as_partially_charged),
        )
        .route(
            "/{id}/advance-delivery",
            post(handlers::sales::advance_delivery),
        );

    let returns_routes = Router::new()
        .route(
            "/",
            post(handlers::returns::create_return).get(handlers::returns::list_returns),
        )
        .route(
            "/{id}",
            get(handlers::returns::get_return)
                .put(handlers::returns::update_return)
                .delete(handlers::returns::delete_return),
        );

    let collects_routes = Router::new()
        .route(
            "/",
            post(handlers::collects::create_collect).get(handlers::collects::list_collects),
        )
        .route(
            "/{id}",
            get(handlers::collects::get_collect).delete(handlers::collects::delete_collect),
        );

    let standing_orders_routes = Router::new()
        .route(
            "/",
            post(handlers::standing_orders::create_standing_order)
                .get(handlers::standing_orders::list_standing_orders),
        )
        .route(
            "/generate",
            post(handlers::standing_orders::generate_standing_orders),
        )
        .route(
            "/{id}",
            get(handlers::standing_orders::get_standing_order)
                .put(handlers::standing_orders::update_standing_order)
                .delete(handlers::standing_orders::delete_standing_order),
        );

    let api_routes = Router::new()
        .nest("/sales", sales_routes)
        .nest("/returns", returns_routes)
        .nest("/collects", collects_routes)
        .nest("/standing-orders", standing_orders_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/api/health", get(health))
        .nest("/api", api_routes)
        .with_state(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("No se pudo abrir el puerto 3000.");

    tracing::info!("servidor escuchando en {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .await
        .expect("El servidor terminó con error.");
}
