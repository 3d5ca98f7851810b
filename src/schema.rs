table! {
    organizations (id) {
        id -> Uuid,
        name -> Text,
        tax_id -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

table! {
    members (org_id, user_id) {
        org_id -> Uuid,
        user_id -> Uuid,
        role -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    invoices (id) {
        id -> Uuid,
        user_id -> Uuid,
        supplier_name -> Text,
        total_amount -> Numeric,
        file_url -> Text,
        status -> Text,
        created_at -> Timestamptz,
    }
}

joinable!(members -> organizations (org_id));

allow_tables_to_appear_in_same_query!(
    organizations,
    members,
    invoices,
);
