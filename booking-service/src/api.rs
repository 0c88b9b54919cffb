use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{slots, Booking, Coupon, CoreError};

use crate::handlers::{BookingManager, CreateBooking};

#[derive(Clone)]
pub struct AppState {
    pub manager: BookingManager,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub field_id: String,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: i32,
    pub coupon_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfirmPaymentRequest {
    #[serde(default)]
    pub deposit: bool,
}

#[derive(Debug, Deserialize)]
pub struct IssueCouponRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct FreeSlotsQuery {
    pub date: NaiveDate,
    pub duration_minutes: i32,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub field_id: String,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: i32,
    pub total_price: i64,
    pub status: shared::BookingStatus,
    pub payment_status: shared::PaymentStatus,
    pub coupon_id: Option<Uuid>,
    pub timeout_at: chrono::DateTime<chrono::Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        BookingResponse {
            id: booking.id,
            field_id: booking.field_id,
            user_id: booking.user_id,
            date: booking.booked_on,
            start_time: slots::format_clock(booking.start_minutes),
            duration_minutes: booking.duration_minutes,
            total_price: booking.total_price,
            status: booking.status,
            payment_status: booking.payment_status,
            coupon_id: booking.coupon_id,
            timeout_at: booking.timeout_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FreeSlotsResponse {
    pub field_id: String,
    pub date: NaiveDate,
    pub duration_minutes: i32,
    pub start_times: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::UnknownField(_)
        | CoreError::UnknownCampaign(_)
        | CoreError::UnknownCoupon(_)
        | CoreError::UnknownBooking(_) => StatusCode::NOT_FOUND,
        CoreError::SlotUnavailable { .. }
        | CoreError::CapacityExceeded(_)
        | CoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CoreError::NotEligible(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        CoreError::CorruptRecord(_) | CoreError::Storage(_) | CoreError::Unavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/:id/confirm", post(confirm_payment))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/fields/:id/free-slots", get(free_slots))
        .route("/campaigns/:id/coupons", post(issue_coupon))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let start_minutes = slots::parse_clock(&request.start_time).ok_or_else(|| {
        CoreError::InvalidRequest(format!("bad start_time `{}`", request.start_time))
    })?;

    let booking = state
        .manager
        .create(CreateBooking {
            field_id: request.field_id,
            user_id: request.user_id,
            booked_on: request.date,
            start_minutes,
            duration_minutes: request.duration_minutes,
            coupon_id: request.coupon_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    body: Option<Json<ConfirmPaymentRequest>>,
) -> Result<Json<BookingResponse>, ApiError> {
    let deposit = body.map(|Json(b)| b.deposit).unwrap_or(false);
    let booking = state.manager.confirm_payment(booking_id, deposit).await?;
    Ok(Json(booking.into()))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.manager.cancel(booking_id).await?;
    Ok(Json(booking.into()))
}

pub async fn free_slots(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<FreeSlotsQuery>,
) -> Result<Json<FreeSlotsResponse>, ApiError> {
    let starts = state
        .manager
        .free_slots(&field_id, query.date, query.duration_minutes)
        .await?;

    Ok(Json(FreeSlotsResponse {
        field_id,
        date: query.date,
        duration_minutes: query.duration_minutes,
        start_times: starts.into_iter().map(slots::format_clock).collect(),
    }))
}

pub async fn issue_coupon(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<IssueCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    let coupon = state
        .manager
        .issue_coupon(campaign_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn error_statuses() {
        assert_eq!(
            status_for(&CoreError::UnknownField("court-z".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CoreError::SlotUnavailable {
                field: "court-a".into(),
                start_minutes: 600,
                duration_minutes: 60,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CoreError::CapacityExceeded(Uuid::new_v4())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CoreError::NotEligible("coupon is not active")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&CoreError::InvalidRequest("bad start_time".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CoreError::Unavailable("pool timed out".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
