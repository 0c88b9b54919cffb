use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(BookingStatus::PendingPayment),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    DepositPaid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::DepositPaid => "deposit_paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "deposit_paid" => Some(PaymentStatus::DepositPaid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Active,
    Inactive,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(CampaignStatus::Active),
            "INACTIVE" => Some(CampaignStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    Active,
    Used,
    Expired,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Active => "ACTIVE",
            CouponStatus::Used => "USED",
            CouponStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(CouponStatus::Active),
            "USED" => Some(CouponStatus::Used),
            "EXPIRED" => Some(CouponStatus::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A campaign's benefit payload. Stored as tagged JSON in the campaign
/// record; anything that does not deserialize into one of these variants
/// denies the redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Benefit {
    FixedDiscount { amount: i64 },
    PercentDiscount { percent: u32 },
}

impl Benefit {
    /// Discounted total, never below zero. Percentages above 100 are
    /// treated as 100.
    pub fn apply(&self, total: i64) -> i64 {
        match *self {
            Benefit::FixedDiscount { amount } => (total - amount.max(0)).max(0),
            Benefit::PercentDiscount { percent } => {
                let percent = i64::from(percent.min(100));
                (total - total * percent / 100).max(0)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub field_id: String,
    pub user_id: Uuid,
    pub booked_on: NaiveDate,
    pub start_minutes: i32,
    pub duration_minutes: i32,
    pub total_price: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub coupon_id: Option<Uuid>,
    pub timeout_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub benefit: Benefit,
    pub redemption_count: i32,
    pub redemption_limit: Option<i32>,
    pub limit_per_user: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: CampaignStatus,
}

impl Campaign {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active && self.starts_at <= now && now < self.ends_at
    }

    pub fn has_capacity(&self) -> bool {
        redemption::has_capacity(self.redemption_count, self.redemption_limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Coupon {
    pub id: Uuid,
    pub user_id: Uuid,
    pub campaign_id: Uuid,
    pub status: CouponStatus,
    pub booking_id: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
}

/// The campaign counter rules, as enforced by the storage layer's
/// conditional updates. Shared with the in-memory model the concurrency
/// tests run against.
pub mod redemption {
    pub fn has_capacity(count: i32, limit: Option<i32>) -> bool {
        match limit {
            Some(limit) => count < limit,
            None => true,
        }
    }

    /// Check-and-increment. Returns whether the reservation was granted;
    /// on denial the count is left untouched.
    pub fn try_increment(count: &mut i32, limit: Option<i32>) -> bool {
        if has_capacity(*count, limit) {
            *count += 1;
            true
        } else {
            false
        }
    }

    /// Decrement with a floor at zero. Returns whether anything changed.
    pub fn release(count: &mut i32) -> bool {
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_status_round_trips() {
        for status in [
            BookingStatus::PendingPayment,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("paid"), None);
    }

    #[test]
    fn payment_status_round_trips() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::DepositPaid,
            PaymentStatus::Failed,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn campaign_and_coupon_statuses_round_trip() {
        for status in [CampaignStatus::Active, CampaignStatus::Inactive] {
            assert_eq!(CampaignStatus::parse(status.as_str()), Some(status));
        }
        for status in [CouponStatus::Active, CouponStatus::Used, CouponStatus::Expired] {
            assert_eq!(CouponStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CouponStatus::parse("active"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!BookingStatus::PendingPayment.is_terminal());
        assert!(BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }

    #[test]
    fn fixed_discount_floors_at_zero() {
        assert_eq!(Benefit::FixedDiscount { amount: 100 }.apply(700), 600);
        assert_eq!(Benefit::FixedDiscount { amount: 900 }.apply(700), 0);
        assert_eq!(Benefit::FixedDiscount { amount: -50 }.apply(700), 700);
    }

    #[test]
    fn percent_discount_clamps() {
        assert_eq!(Benefit::PercentDiscount { percent: 10 }.apply(700), 630);
        assert_eq!(Benefit::PercentDiscount { percent: 100 }.apply(700), 0);
        assert_eq!(Benefit::PercentDiscount { percent: 250 }.apply(700), 0);
        assert_eq!(Benefit::PercentDiscount { percent: 0 }.apply(700), 700);
    }

    #[test]
    fn benefit_deserializes_from_tagged_json() {
        let fixed: Benefit =
            serde_json::from_value(serde_json::json!({"type": "fixed_discount", "amount": 200}))
                .unwrap();
        assert_eq!(fixed, Benefit::FixedDiscount { amount: 200 });

        let percent: Benefit =
            serde_json::from_value(serde_json::json!({"type": "percent_discount", "percent": 15}))
                .unwrap();
        assert_eq!(percent, Benefit::PercentDiscount { percent: 15 });

        let unknown: Result<Benefit, _> =
            serde_json::from_value(serde_json::json!({"type": "free_drink"}));
        assert!(unknown.is_err());
    }

    #[test]
    fn campaign_window_bounds_are_half_open() {
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: "launch".into(),
            benefit: Benefit::FixedDiscount { amount: 100 },
            redemption_count: 0,
            redemption_limit: Some(10),
            limit_per_user: Some(1),
            starts_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            ends_at: "2026-02-01T00:00:00Z".parse().unwrap(),
            status: CampaignStatus::Active,
        };
        assert!(campaign.is_open_at("2026-01-01T00:00:00Z".parse().unwrap()));
        assert!(campaign.is_open_at("2026-01-15T12:00:00Z".parse().unwrap()));
        assert!(!campaign.is_open_at("2026-02-01T00:00:00Z".parse().unwrap()));

        let inactive = Campaign {
            status: CampaignStatus::Inactive,
            ..campaign
        };
        assert!(!inactive.is_open_at("2026-01-15T12:00:00Z".parse().unwrap()));
    }

    #[test]
    fn counter_grants_until_the_limit() {
        let mut count = 0;
        assert!(redemption::try_increment(&mut count, Some(2)));
        assert!(redemption::try_increment(&mut count, Some(2)));
        assert!(!redemption::try_increment(&mut count, Some(2)));
        assert_eq!(count, 2);
    }

    #[test]
    fn counter_without_limit_always_grants() {
        let mut count = 0;
        for _ in 0..100 {
            assert!(redemption::try_increment(&mut count, None));
        }
        assert_eq!(count, 100);
    }

    #[test]
    fn release_floors_at_zero() {
        let mut count = 1;
        assert!(redemption::release(&mut count));
        assert!(!redemption::release(&mut count));
        assert_eq!(count, 0);
    }
}
