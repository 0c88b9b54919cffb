diesel::table! {
    fields (id) {
        id -> Varchar,
        name -> Varchar,
        pre_rate -> Int8,
        post_rate -> Int8,
        open_minutes -> Int4,
        close_minutes -> Int4,
    }
}

diesel::table! {
    campaigns (id) {
        id -> Uuid,
        name -> Varchar,
        benefit -> Jsonb,
        redemption_count -> Int4,
        redemption_limit -> Nullable<Int4>,
        limit_per_user -> Nullable<Int4>,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        status -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    user_coupons (id) {
        id -> Uuid,
        user_id -> Uuid,
        campaign_id -> Uuid,
        status -> Varchar,
        booking_id -> Nullable<Uuid>,
        used_at -> Nullable<Timestamptz>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    bookings (id) {
        id -> Uuid,
        field_id -> Varchar,
        user_id -> Uuid,
        booked_on -> Date,
        start_minutes -> Int4,
        duration_minutes -> Int4,
        total_price -> Numeric,
        status -> Varchar,
        payment_status -> Varchar,
        coupon_id -> Nullable<Uuid>,
        timeout_at -> Timestamptz,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(fields, campaigns, user_coupons, bookings);
