// Mirrors the tables owned by the hosted Supabase project. Migrations live there.

diesel::table! {
    availability_slots (id) {
        id -> Uuid,
        mentor_id -> Uuid,
        date -> Date,
        start_time -> Time,
        end_time -> Time,
        is_booked -> Bool,
        is_reserved -> Bool,
        reserved_by -> Nullable<Text>,
        reserved_until -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    bookings (id) {
        id -> Uuid,
        mentor_id -> Uuid,
        slot_id -> Nullable<Uuid>,
        user_id -> Nullable<Uuid>,
        user_name -> Text,
        user_email -> Text,
        user_phone -> Nullable<Text>,
        session_type -> Text,
        session_price -> Int4,
        date -> Date,
        start_time -> Time,
        end_time -> Time,
        status -> Text,
        meet_link -> Nullable<Text>,
        razorpay_order_id -> Text,
        confirmed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    mentors (id) {
        id -> Uuid,
        user_id -> Nullable<Uuid>,
        name -> Text,
        email -> Text,
        role -> Nullable<Text>,
        college -> Text,
        price -> Int4,
        bio -> Nullable<Text>,
        expertise -> Array<Text>,
        meet_link -> Nullable<Text>,
        image_url -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    nsat_referrals (id) {
        id -> Uuid,
        student_name -> Text,
        student_email -> Text,
        student_phone -> Nullable<Text>,
        nsat_registration_id -> Text,
        preferred_mentor_id -> Nullable<Uuid>,
        status -> Text,
        admin_note -> Nullable<Text>,
        referral_code -> Nullable<Text>,
        reviewed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    payments (id) {
        id -> Uuid,
        booking_id -> Nullable<Uuid>,
        razorpay_order_id -> Text,
        razorpay_payment_id -> Text,
        razorpay_signature -> Nullable<Text>,
        amount -> Int8,
        currency -> Text,
        status -> Text,
        invoice_id -> Text,
        payment_method -> Text,
        card_network -> Nullable<Text>,
        card_last4 -> Nullable<Text>,
        bank -> Nullable<Text>,
        wallet -> Nullable<Text>,
        vpa -> Nullable<Text>,
        fee -> Nullable<Int8>,
        tax -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    profiles (id) {
        id -> Uuid,
        full_name -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    referral_codes (id) {
        id -> Uuid,
        code -> Text,
        discount_percent -> Int4,
        max_uses -> Nullable<Int4>,
        times_used -> Int4,
        is_active -> Bool,
        expires_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    referral_uses (id) {
        id -> Uuid,
        referral_code_id -> Uuid,
        code -> Text,
        user_email -> Text,
        razorpay_order_id -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(availability_slots -> mentors (mentor_id));
diesel::joinable!(bookings -> mentors (mentor_id));
diesel::joinable!(payments -> bookings (booking_id));
diesel::joinable!(referral_uses -> referral_codes (referral_code_id));

diesel::allow_tables_to_appear_in_same_query!(
    availability_slots,
    bookings,
    mentors,
    nsat_referrals,
    payments,
    profiles,
    referral_codes,
    referral_uses,
);
