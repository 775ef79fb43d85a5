use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, StaffId},
    },
    identity,
    models::{CreateProductEntity, ProductEntity},
    schema::{products, restaurants},
};

const MAX_PRODUCT_NAME_LEN: usize = 200;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products, create_product))
            .route_layer(axum::middleware::from_fn(middleware::staff_authorization)),
    )
}

#[derive(Serialize, ToSchema, Debug)]
struct ProductRes {
    #[serde(flatten)]
    product: ProductEntity,
    restaurant_name: String,
}

/// Fetch the caller's restaurant catalog, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    security(("staffId" = [])),
    responses(
        (status = 200, description = "Get products successfully", body = StdResponse<Vec<ProductRes>, String>)
    )
)]
async fn get_products(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;

    let products: Vec<(ProductEntity, String)> = products::table
        .inner_join(restaurants::table)
        .filter(products::restaurant_id.eq(staff.restaurant_id()))
        .order_by((products::created_at.desc(), products::id.desc()))
        .select((ProductEntity::as_select(), restaurants::name))
        .load(conn)
        .await
        .context("Failed to get products")?;

    let products: Vec<ProductRes> = products
        .into_iter()
        .map(|(product, restaurant_name)| ProductRes {
            product,
            restaurant_name,
        })
        .collect();

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateProductReq {
    name: String,
    description: Option<String>,
    price: i32,
}

fn validate_product(req: &CreateProductReq) -> Result<(), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }
    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Product name must be at most {} characters",
            MAX_PRODUCT_NAME_LEN
        )));
    }
    if req.price < 0 {
        return Err(AppError::BadRequest("Price must be a non-negative integer".into()));
    }
    Ok(())
}

/// Add a product to the caller's restaurant.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Products"],
    security(("staffId" = [])),
    request_body = CreateProductReq,
    responses(
        (status = 201, description = "Created product successfully", body = StdResponse<ProductEntity, String>),
        (status = 400, description = "Invalid product")
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
    body: Result<Json<CreateProductReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    validate_product(&body)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;

    let product: ProductEntity = diesel::insert_into(products::table)
        .values(CreateProductEntity {
            restaurant_id: staff.restaurant_id(),
            name: body.name.trim().to_string(),
            description: body.description.unwrap_or_default(),
            price: body.price,
            created_at: state.clock.now(),
        })
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(
        "Created product {} for restaurant {}",
        product.id,
        product.restaurant_id
    );

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(product),
            message: Some("Created product successfully"),
        },
    ))
}
