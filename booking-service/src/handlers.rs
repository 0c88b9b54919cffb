use chrono::{Duration, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{info, warn};
use uuid::Uuid;

use shared::slots::{self, SearchMode, Span};
use shared::{pricing, Booking, BookingStatus, CoreError, Coupon, PaymentStatus};

use crate::coupons;
use crate::models::{BookingRow, FieldRow, NewBooking};
use crate::schema::{bookings, fields};

type DbPool = Pool<AsyncPgConnection>;
type DbConn<'a> = PooledConnection<'a, AsyncPgConnection>;

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub field_id: String,
    pub user_id: Uuid,
    pub booked_on: NaiveDate,
    pub start_minutes: i32,
    pub duration_minutes: i32,
    pub coupon_id: Option<Uuid>,
}

/// Orchestrates the booking lifecycle. All contended transitions go
/// through conditional updates, so any number of manager instances can
/// run against the same database.
#[derive(Clone)]
pub struct BookingManager {
    pool: DbPool,
    payment_timeout_minutes: i64,
    slot_step_minutes: i32,
}

impl BookingManager {
    pub fn new(pool: DbPool, payment_timeout_minutes: i64, slot_step_minutes: i32) -> Self {
        Self {
            pool,
            payment_timeout_minutes,
            slot_step_minutes,
        }
    }

    async fn conn(&self) -> Result<DbConn<'_>, CoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| CoreError::Unavailable(e.to_string()))
    }

    /// Create a booking in `pending_payment`. Runs as one transaction:
    /// slot validation, pricing, coupon reservation and the insert either
    /// all commit or none do.
    pub async fn create(&self, request: CreateBooking) -> Result<Booking, CoreError> {
        if request.duration_minutes <= 0 {
            return Err(CoreError::InvalidRequest(
                "duration_minutes must be positive".to_string(),
            ));
        }
        let now = Utc::now();
        let timeout_at = now + Duration::minutes(self.payment_timeout_minutes);

        let mut conn = self.conn().await?;
        let booking = conn
            .transaction::<Booking, CoreError, _>(|conn| {
                Box::pin(async move {
                    let field: Option<FieldRow> = fields::table
                        .find(&request.field_id)
                        .first(conn)
                        .await
                        .optional()?;
                    let field =
                        field.ok_or_else(|| CoreError::UnknownField(request.field_id.clone()))?;

                    let end_minutes = request.start_minutes + request.duration_minutes;
                    if request.start_minutes < field.open_minutes
                        || end_minutes > field.close_minutes
                    {
                        return Err(CoreError::SlotUnavailable {
                            field: field.id.clone(),
                            start_minutes: request.start_minutes,
                            duration_minutes: request.duration_minutes,
                        });
                    }

                    let existing: Vec<BookingRow> = bookings::table
                        .filter(bookings::field_id.eq(&request.field_id))
                        .filter(bookings::booked_on.eq(request.booked_on))
                        .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
                        .load(conn)
                        .await?;
                    let spans: Vec<Span> = existing
                        .iter()
                        .map(|row| Span::new(row.start_minutes, row.duration_minutes))
                        .collect();
                    if slots::has_conflict(request.start_minutes, request.duration_minutes, &spans)
                    {
                        return Err(CoreError::SlotUnavailable {
                            field: field.id.clone(),
                            start_minutes: request.start_minutes,
                            duration_minutes: request.duration_minutes,
                        });
                    }

                    let base_price = pricing::quote(
                        field.rates(),
                        request.start_minutes,
                        request.duration_minutes,
                    );

                    let redemption = match request.coupon_id {
                        Some(coupon_id) => Some(
                            coupons::load_for_redemption(conn, coupon_id, request.user_id, now)
                                .await?,
                        ),
                        None => None,
                    };
                    let total_price = match &redemption {
                        Some((_, campaign)) => campaign.benefit.apply(base_price),
                        None => base_price,
                    };

                    let booking = Booking {
                        id: Uuid::new_v4(),
                        field_id: request.field_id.clone(),
                        user_id: request.user_id,
                        booked_on: request.booked_on,
                        start_minutes: request.start_minutes,
                        duration_minutes: request.duration_minutes,
                        total_price,
                        status: BookingStatus::PendingPayment,
                        payment_status: PaymentStatus::Pending,
                        coupon_id: request.coupon_id,
                        timeout_at,
                    };
                    diesel::insert_into(bookings::table)
                        .values(&NewBooking::from(&booking))
                        .execute(conn)
                        .await?;

                    if let Some((coupon, campaign)) = redemption {
                        coupons::reserve(conn, &campaign, coupon.id, request.user_id, booking.id, now)
                            .await?;
                    }

                    Ok(booking)
                })
            })
            .await?;

        info!(
            "Created booking {} on {} at {} for {}",
            booking.id,
            booking.field_id,
            slots::format_clock(booking.start_minutes),
            booking.total_price
        );
        Ok(booking)
    }

    /// Mark a booking paid. Idempotent: a booking that is already
    /// `confirmed` comes back unchanged, and a booking the timeout sweep
    /// cancelled first stays cancelled (the first committed transition
    /// wins either way).
    pub async fn confirm_payment(
        &self,
        booking_id: Uuid,
        deposit: bool,
    ) -> Result<Booking, CoreError> {
        let now = Utc::now();
        let payment_status = if deposit {
            PaymentStatus::DepositPaid
        } else {
            PaymentStatus::Paid
        };

        let mut conn = self.conn().await?;
        let updated: Option<BookingRow> = diesel::update(
            bookings::table
                .filter(bookings::id.eq(booking_id))
                .filter(bookings::status.eq(BookingStatus::PendingPayment.as_str())),
        )
        .set((
            bookings::status.eq(BookingStatus::Confirmed.as_str()),
            bookings::payment_status.eq(payment_status.as_str()),
            bookings::updated_at.eq(now),
        ))
        .get_result(&mut conn)
        .await
        .optional()?;

        if let Some(row) = updated {
            info!("Booking {} confirmed", booking_id);
            return Booking::try_from(row);
        }

        let row: Option<BookingRow> = bookings::table
            .find(booking_id)
            .first(&mut conn)
            .await
            .optional()?;
        let booking = Booking::try_from(row.ok_or(CoreError::UnknownBooking(booking_id))?)?;
        match booking.status {
            BookingStatus::Confirmed => info!("Booking {} already confirmed", booking_id),
            BookingStatus::Cancelled => warn!(
                "Payment for booking {} arrived after it was released",
                booking_id
            ),
            BookingStatus::PendingPayment => {}
        }
        Ok(booking)
    }

    /// Cancel a booking that has not been paid, handing any reserved
    /// coupon back. Cancelling an already-cancelled booking is a no-op;
    /// a confirmed booking cannot be cancelled here.
    pub async fn cancel(&self, booking_id: Uuid) -> Result<Booking, CoreError> {
        let now = Utc::now();
        let mut conn = self.conn().await?;
        conn.transaction::<Booking, CoreError, _>(|conn| {
            Box::pin(async move {
                let updated: Option<BookingRow> = diesel::update(
                    bookings::table
                        .filter(bookings::id.eq(booking_id))
                        .filter(bookings::status.eq(BookingStatus::PendingPayment.as_str())),
                )
                .set((
                    bookings::status.eq(BookingStatus::Cancelled.as_str()),
                    bookings::updated_at.eq(now),
                ))
                .get_result(conn)
                .await
                .optional()?;

                match updated {
                    Some(row) => {
                        if let Some(coupon_id) = row.coupon_id {
                            if coupons::release(conn, coupon_id, row.id, now).await? {
                                info!(
                                    "Released coupon {} from cancelled booking {}",
                                    coupon_id, row.id
                                );
                            }
                        }
                        info!("Booking {} cancelled", booking_id);
                        Booking::try_from(row)
                    }
                    None => {
                        let row: Option<BookingRow> = bookings::table
                            .find(booking_id)
                            .first(conn)
                            .await
                            .optional()?;
                        let booking =
                            Booking::try_from(row.ok_or(CoreError::UnknownBooking(booking_id))?)?;
                        match booking.status {
                            BookingStatus::Confirmed => Err(CoreError::InvalidTransition {
                                from: BookingStatus::Confirmed,
                                to: BookingStatus::Cancelled,
                            }),
                            _ => Ok(booking),
                        }
                    }
                }
            })
        })
        .await
    }

    /// Cancel every `pending_payment` booking whose payment deadline has
    /// passed and release their coupons. One conditional batch update
    /// claims the expired rows, so overlapping sweeps (or a sweep racing a
    /// payment confirmation) each take a given booking at most once.
    pub async fn expire_timeouts(&self) -> Result<usize, CoreError> {
        let now = Utc::now();
        let mut conn = self.conn().await?;
        conn.transaction::<usize, CoreError, _>(|conn| {
            Box::pin(async move {
                let expired: Vec<BookingRow> = diesel::update(
                    bookings::table
                        .filter(bookings::status.eq(BookingStatus::PendingPayment.as_str()))
                        .filter(bookings::timeout_at.le(now)),
                )
                .set((
                    bookings::status.eq(BookingStatus::Cancelled.as_str()),
                    bookings::payment_status.eq(PaymentStatus::Failed.as_str()),
                    bookings::updated_at.eq(now),
                ))
                .get_results(conn)
                .await?;

                for row in &expired {
                    if let Some(coupon_id) = row.coupon_id {
                        if coupons::release(conn, coupon_id, row.id, now).await? {
                            info!(
                                "Released coupon {} from expired booking {}",
                                coupon_id, row.id
                            );
                        }
                    }
                }

                Ok(expired.len())
            })
        })
        .await
    }

    /// Sweep ACTIVE coupons of closed campaigns over to EXPIRED.
    pub async fn expire_coupons(&self) -> Result<usize, CoreError> {
        let now = Utc::now();
        let mut conn = self.conn().await?;
        coupons::expire_lapsed(&mut conn, now).await
    }

    /// Free start times for a field on a date. The service enumerates the
    /// fixed step grid; see `shared::slots` for the gap-fill variant.
    pub async fn free_slots(
        &self,
        field_id: &str,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> Result<Vec<i32>, CoreError> {
        if duration_minutes <= 0 {
            return Err(CoreError::InvalidRequest(
                "duration_minutes must be positive".to_string(),
            ));
        }

        let mut conn = self.conn().await?;
        let field: Option<FieldRow> = fields::table.find(field_id).first(&mut conn).await.optional()?;
        let field = field.ok_or_else(|| CoreError::UnknownField(field_id.to_string()))?;

        let existing: Vec<BookingRow> = bookings::table
            .filter(bookings::field_id.eq(field_id))
            .filter(bookings::booked_on.eq(date))
            .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
            .load(&mut conn)
            .await?;
        let spans: Vec<Span> = existing
            .iter()
            .map(|row| Span::new(row.start_minutes, row.duration_minutes))
            .collect();

        Ok(slots::find_free_slots(
            &spans,
            field.open_minutes,
            field.close_minutes,
            self.slot_step_minutes,
            duration_minutes,
            SearchMode::FixedGrid,
        ))
    }

    /// Claim a coupon for a user against a campaign.
    pub async fn issue_coupon(&self, campaign_id: Uuid, user_id: Uuid) -> Result<Coupon, CoreError> {
        let now = Utc::now();
        let mut conn = self.conn().await?;
        let coupon = conn
            .transaction::<Coupon, CoreError, _>(|conn| {
                Box::pin(async move { coupons::issue(conn, campaign_id, user_id, now).await })
            })
            .await?;
        info!(
            "Issued coupon {} on campaign {} to user {}",
            coupon.id, campaign_id, user_id
        );
        Ok(coupon)
    }
}
