// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Sales ---
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::sales::update_sale,
        handlers::sales::delete_sale,
        handlers::sales::cancel_sale,
        handlers::sales::mark_as_delivered,
        handlers::sales::mark_as_charged,
        handlers::sales::mark_as_partially_charged,

        // --- Scheduler ---
        handlers::sales::advance_delivery,
        handlers::sales::check_delivery,
        handlers::standing_orders::generate_standing_orders,

        // --- Returns ---
        handlers::returns::create_return,
        handlers::returns::list_returns,
        handlers::returns::get_return,
        handlers::returns::update_return,
        handlers::returns::delete_return,

        // --- Collects ---
        handlers::collects::create_collect,
        handlers::collects::list_collects,
        handlers::collects::get_collect,
        handlers::collects::delete_collect,

        // --- Standing orders ---
        handlers::standing_orders::create_standing_order,
        handlers::standing_orders::list_standing_orders,
        handlers::standing_orders::get_standing_order,
        handlers::standing_orders::update_standing_order,
        handlers::standing_orders::delete_standing_order,

        // --- Statistics ---
        handlers::statistics::get_statistics,
    ),
    components(
        schemas(
            // --- Catalog ---
            models::catalog::SaleType,
            models::catalog::Product,
            models::catalog::Customer,

            // --- Sales ---
            models::sales::PaymentMethod,
            models::sales::SaleState,
            models::sales::Sale,
            models::sales::SaleDetail,
            models::sales::StateChange,
            models::sales::SaleResponse,
            handlers::sales::SalePayload,
            handlers::sales::SaleLinePayload,
            handlers::sales::PartialChargePayload,

            // --- Returns ---
            models::returns::Return,
            models::returns::ReturnDetail,
            models::returns::ReturnResponse,
            handlers::returns::CreateReturnPayload,
            handlers::returns::UpdateReturnPayload,
            handlers::returns::ReturnLinePayload,

            // --- Collects ---
            models::collects::Collect,
            handlers::collects::CreateCollectPayload,

            // --- Standing orders ---
            models::standing_orders::StandingOrder,
            models::standing_orders::StandingOrderDetail,
            models::standing_orders::StandingOrderResponse,
            handlers::standing_orders::CreateStandingOrderPayload,
            handlers::standing_orders::UpdateStandingOrderPayload,
            handlers::standing_orders::StandingOrderLinePayload,

            // --- Statistics ---
            models::statistics::ProductQuantity,
            models::statistics::PeriodBucket,
            models::statistics::StatisticsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Sales", description = "Ciclo de vida de ventas"),
        (name = "Returns", description = "Devoluciones contra ventas cobradas"),
        (name = "Collects", description = "Cobros de cuenta corriente"),
        (name = "StandingOrders", description = "Pedidos fijos semanales"),
        (name = "Statistics", description = "Estadísticas y conciliación"),
        (name = "Scheduler", description = "Operaciones invocadas por el scheduler externo"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_jwt",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
