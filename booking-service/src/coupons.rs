//! Coupon redemption gate.
//!
//! Every contended mutation here is a single conditional `UPDATE` whose
//! affected-row count is the grant signal; the campaign row lock taken by
//! the redemption increment serializes concurrent reservers, so a limit of
//! N can never hand out more than N grants. `reserve` runs inside the
//! booking-creation transaction: any later failure rolls the increment and
//! the coupon flip back together.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use shared::{Campaign, CoreError, Coupon, CouponStatus};

use crate::models::{CampaignRow, CouponRow, NewCoupon};
use crate::schema::{campaigns, user_coupons};

/// Load and pre-check a coupon the caller wants to redeem. These reads are
/// advisory; the conditional updates in [`reserve`] are what actually
/// enforce eligibility under concurrency.
pub async fn load_for_redemption(
    conn: &mut AsyncPgConnection,
    coupon_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(Coupon, Campaign), CoreError> {
    let row: Option<CouponRow> = user_coupons::table
        .find(coupon_id)
        .first(conn)
        .await
        .optional()?;
    let coupon = Coupon::try_from(row.ok_or(CoreError::UnknownCoupon(coupon_id))?)?;

    if coupon.user_id != user_id {
        return Err(CoreError::NotEligible("coupon belongs to another user"));
    }
    if coupon.status != CouponStatus::Active {
        return Err(CoreError::NotEligible("coupon is not active"));
    }

    let row: Option<CampaignRow> = campaigns::table
        .find(coupon.campaign_id)
        .first(conn)
        .await
        .optional()?;
    let campaign = Campaign::try_from(row.ok_or(CoreError::UnknownCampaign(coupon.campaign_id))?)?;

    if !campaign.is_open_at(now) {
        return Err(CoreError::NotEligible("campaign is not open"));
    }

    Ok((coupon, campaign))
}

/// Consume one redemption of `campaign` with `coupon_id`, binding the
/// coupon to `booking_id`. Must run inside the transaction that inserts
/// the booking.
pub async fn reserve(
    conn: &mut AsyncPgConnection,
    campaign: &Campaign,
    coupon_id: Uuid,
    user_id: Uuid,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    let granted = diesel::update(
        campaigns::table
            .filter(campaigns::id.eq(campaign.id))
            .filter(campaigns::status.eq(shared::CampaignStatus::Active.as_str()))
            .filter(campaigns::starts_at.le(now))
            .filter(campaigns::ends_at.gt(now))
            .filter(
                campaigns::redemption_limit
                    .is_null()
                    .or(campaigns::redemption_count
                        .nullable()
                        .lt(campaigns::redemption_limit)),
            ),
    )
    .set((
        campaigns::redemption_count.eq(campaigns::redemption_count + 1),
        campaigns::updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    if granted == 0 {
        return Err(refusal_reason(conn, campaign.id, now).await?);
    }

    let used = diesel::update(
        user_coupons::table
            .filter(user_coupons::id.eq(coupon_id))
            .filter(user_coupons::user_id.eq(user_id))
            .filter(user_coupons::status.eq(CouponStatus::Active.as_str())),
    )
    .set((
        user_coupons::status.eq(CouponStatus::Used.as_str()),
        user_coupons::booking_id.eq(booking_id),
        user_coupons::used_at.eq(now),
        user_coupons::updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    if used == 0 {
        // Rolls the increment back with the enclosing transaction.
        return Err(CoreError::NotEligible("coupon was already used"));
    }

    Ok(())
}

/// Re-read the campaign after a refused increment to report why.
async fn refusal_reason(
    conn: &mut AsyncPgConnection,
    campaign_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CoreError, CoreError> {
    let row: Option<CampaignRow> = campaigns::table
        .find(campaign_id)
        .first(conn)
        .await
        .optional()?;
    let campaign = match row {
        Some(row) => Campaign::try_from(row)?,
        None => return Ok(CoreError::UnknownCampaign(campaign_id)),
    };
    if !campaign.is_open_at(now) {
        Ok(CoreError::NotEligible("campaign is not open"))
    } else {
        Ok(CoreError::CapacityExceeded(campaign_id))
    }
}

/// Hand a reserved redemption back: flip the coupon USED -> ACTIVE and give
/// the campaign its slot back. The coupon compare-and-swap keys on
/// `booking_id`, so repeated calls for the same booking apply once and the
/// counter is never decremented twice. Returns whether anything changed.
pub async fn release(
    conn: &mut AsyncPgConnection,
    coupon_id: Uuid,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, CoreError> {
    let restored: Option<CouponRow> = diesel::update(
        user_coupons::table
            .filter(user_coupons::id.eq(coupon_id))
            .filter(user_coupons::booking_id.eq(booking_id))
            .filter(user_coupons::status.eq(CouponStatus::Used.as_str())),
    )
    .set((
        user_coupons::status.eq(CouponStatus::Active.as_str()),
        user_coupons::booking_id.eq(None::<Uuid>),
        user_coupons::used_at.eq(None::<DateTime<Utc>>),
        user_coupons::updated_at.eq(now),
    ))
    .get_result(conn)
    .await
    .optional()?;

    let restored = match restored {
        Some(row) => row,
        None => return Ok(false),
    };

    diesel::update(
        campaigns::table
            .filter(campaigns::id.eq(restored.campaign_id))
            .filter(campaigns::redemption_count.gt(0)),
    )
    .set((
        campaigns::redemption_count.eq(campaigns::redemption_count - 1),
        campaigns::updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    Ok(true)
}

/// Issue a fresh coupon for a campaign. Must run inside a transaction:
/// the `FOR UPDATE` lock on the campaign row serializes concurrent claims
/// so the per-user limit holds.
pub async fn issue(
    conn: &mut AsyncPgConnection,
    campaign_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Coupon, CoreError> {
    let row: Option<CampaignRow> = campaigns::table
        .find(campaign_id)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    let campaign = Campaign::try_from(row.ok_or(CoreError::UnknownCampaign(campaign_id))?)?;

    if !campaign.is_open_at(now) {
        return Err(CoreError::NotEligible("campaign is not open"));
    }
    if let Some(limit) = campaign.limit_per_user {
        let held: i64 = user_coupons::table
            .filter(user_coupons::campaign_id.eq(campaign_id))
            .filter(user_coupons::user_id.eq(user_id))
            .count()
            .get_result(conn)
            .await?;
        if held >= i64::from(limit) {
            return Err(CoreError::NotEligible("per-user coupon limit reached"));
        }
    }

    let new_coupon = NewCoupon {
        id: Uuid::new_v4(),
        user_id,
        campaign_id,
        status: CouponStatus::Active.as_str().to_string(),
    };
    diesel::insert_into(user_coupons::table)
        .values(&new_coupon)
        .execute(conn)
        .await?;

    Ok(Coupon {
        id: new_coupon.id,
        user_id,
        campaign_id,
        status: CouponStatus::Active,
        booking_id: None,
        used_at: None,
    })
}

/// Sweep ACTIVE coupons whose campaign window has closed over to EXPIRED.
pub async fn expire_lapsed(
    conn: &mut AsyncPgConnection,
    now: DateTime<Utc>,
) -> Result<usize, CoreError> {
    let ended_campaigns = campaigns::table
        .filter(campaigns::ends_at.le(now))
        .select(campaigns::id);

    let expired = diesel::update(
        user_coupons::table
            .filter(user_coupons::status.eq(CouponStatus::Active.as_str()))
            .filter(user_coupons::campaign_id.eq_any(ended_campaigns)),
    )
    .set((
        user_coupons::status.eq(CouponStatus::Expired.as_str()),
        user_coupons::updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    Ok(expired)
}
