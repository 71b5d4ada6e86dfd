diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        is_active -> Bool,
        is_admin -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    panels (id) {
        id -> Uuid,
        user_id -> Uuid,
        name -> Varchar,
        alias -> Nullable<Varchar>,
        url -> Varchar,
        api_key -> Text,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    devices (id) {
        id -> Uuid,
        user_id -> Uuid,
        label -> Varchar,
        connection_status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        user_id -> Uuid,
        panel_id -> Uuid,
        external_order_id -> Varchar,
        provider_order_id -> Nullable<Varchar>,
        provider_name -> Nullable<Varchar>,
        service_id -> Nullable<Varchar>,
        service_name -> Nullable<Varchar>,
        link -> Nullable<Text>,
        quantity -> Int4,
        remains -> Nullable<Int4>,
        start_count -> Nullable<Int4>,
        status -> Varchar,
        charge -> Nullable<Numeric>,
        can_refill -> Bool,
        can_cancel -> Bool,
        has_guarantee -> Bool,
        customer_username -> Nullable<Varchar>,
        customer_email -> Nullable<Varchar>,
        customer_phone -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    provider_groups (id) {
        id -> Uuid,
        panel_id -> Uuid,
        provider_name -> Nullable<Varchar>,
        device_id -> Nullable<Uuid>,
        group_jid -> Text,
        name -> Varchar,
        new_order_template -> Nullable<Text>,
        refill_template -> Nullable<Text>,
        cancel_template -> Nullable<Text>,
        speedup_template -> Nullable<Text>,
        custom_template -> Nullable<Text>,
        use_simple_format -> Bool,
        is_manual_service -> Bool,
        service_id_rules -> Nullable<Jsonb>,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    provider_configs (id) {
        id -> Uuid,
        user_id -> Uuid,
        provider_name -> Varchar,
        alias -> Nullable<Varchar>,
        forward_refill -> Bool,
        forward_cancel -> Bool,
        forward_speedup -> Bool,
        whatsapp_group_jid -> Nullable<Text>,
        whatsapp_number -> Nullable<Varchar>,
        telegram_chat_id -> Nullable<Varchar>,
        device_id -> Nullable<Uuid>,
        new_order_template -> Nullable<Text>,
        refill_template -> Nullable<Text>,
        cancel_template -> Nullable<Text>,
        speedup_template -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    order_commands (id) {
        id -> Uuid,
        order_id -> Uuid,
        command -> Varchar,
        status -> Varchar,
        forwarded_to -> Nullable<Varchar>,
        response -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    panels,
    devices,
    orders,
    provider_groups,
    provider_configs,
    order_commands,
);
