use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use num_traits::ToPrimitive;
use uuid::Uuid;

use shared::{
    Benefit, Booking, BookingStatus, Campaign, CampaignStatus, CoreError, Coupon, CouponStatus,
    PaymentStatus,
};

#[derive(Debug, Clone, Queryable)]
pub struct FieldRow {
    pub id: String,
    pub name: String,
    pub pre_rate: i64,
    pub post_rate: i64,
    pub open_minutes: i32,
    pub close_minutes: i32,
}

impl FieldRow {
    pub fn rates(&self) -> shared::pricing::Rates {
        shared::pricing::Rates {
            pre_rate: self.pre_rate,
            post_rate: self.post_rate,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct BookingRow {
    pub id: Uuid,
    pub field_id: String,
    pub user_id: Uuid,
    pub booked_on: NaiveDate,
    pub start_minutes: i32,
    pub duration_minutes: i32,
    pub total_price: BigDecimal,
    pub status: String,
    pub payment_status: String,
    pub coupon_id: Option<Uuid>,
    pub timeout_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct NewBooking {
    pub id: Uuid,
    pub field_id: String,
    pub user_id: Uuid,
    pub booked_on: NaiveDate,
    pub start_minutes: i32,
    pub duration_minutes: i32,
    pub total_price: BigDecimal,
    pub status: String,
    pub payment_status: String,
    pub coupon_id: Option<Uuid>,
    pub timeout_at: DateTime<Utc>,
}

impl From<&Booking> for NewBooking {
    fn from(booking: &Booking) -> Self {
        NewBooking {
            id: booking.id,
            field_id: booking.field_id.clone(),
            user_id: booking.user_id,
            booked_on: booking.booked_on,
            start_minutes: booking.start_minutes,
            duration_minutes: booking.duration_minutes,
            total_price: BigDecimal::from(booking.total_price),
            status: booking.status.as_str().to_string(),
            payment_status: booking.payment_status.as_str().to_string(),
            coupon_id: booking.coupon_id,
            timeout_at: booking.timeout_at,
        }
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| corrupt("booking", row.id, "status", &row.status))?;
        let payment_status = PaymentStatus::parse(&row.payment_status)
            .ok_or_else(|| corrupt("booking", row.id, "payment_status", &row.payment_status))?;
        let total_price = row
            .total_price
            .to_i64()
            .ok_or_else(|| corrupt("booking", row.id, "total_price", &row.total_price.to_string()))?;

        Ok(Booking {
            id: row.id,
            field_id: row.field_id,
            user_id: row.user_id,
            booked_on: row.booked_on,
            start_minutes: row.start_minutes,
            duration_minutes: row.duration_minutes,
            total_price,
            status,
            payment_status,
            coupon_id: row.coupon_id,
            timeout_at: row.timeout_at,
        })
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct CampaignRow {
    pub id: Uuid,
    pub name: String,
    pub benefit: serde_json::Value,
    pub redemption_count: i32,
    pub redemption_limit: Option<i32>,
    pub limit_per_user: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = CoreError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let status = CampaignStatus::parse(&row.status)
            .ok_or_else(|| corrupt("campaign", row.id, "status", &row.status))?;
        let benefit: Benefit = serde_json::from_value(row.benefit)
            .map_err(|e| corrupt("campaign", row.id, "benefit", &e.to_string()))?;

        Ok(Campaign {
            id: row.id,
            name: row.name,
            benefit,
            redemption_count: row.redemption_count,
            redemption_limit: row.redemption_limit,
            limit_per_user: row.limit_per_user,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            status,
        })
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct CouponRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub campaign_id: Uuid,
    pub status: String,
    pub booking_id: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::user_coupons)]
pub struct NewCoupon {
    pub id: Uuid,
    pub user_id: Uuid,
    pub campaign_id: Uuid,
    pub status: String,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = CoreError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let status = CouponStatus::parse(&row.status)
            .ok_or_else(|| corrupt("coupon", row.id, "status", &row.status))?;

        Ok(Coupon {
            id: row.id,
            user_id: row.user_id,
            campaign_id: row.campaign_id,
            status,
            booking_id: row.booking_id,
            used_at: row.used_at,
        })
    }
}

fn corrupt(entity: &str, id: Uuid, column: &str, value: &str) -> CoreError {
    CoreError::CorruptRecord(format!("{entity} {id}: bad {column} `{value}`"))
}
