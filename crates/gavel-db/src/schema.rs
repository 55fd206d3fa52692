diesel::table! {
    artefacts (id) {
        id -> Integer,
        checksum -> Text,
        algorithm -> Text,
        group_id -> Text,
        artifact_id -> Text,
        version -> Text,
        classifier -> Nullable<Text>,
        packaging -> Nullable<Text>,
        prod_key -> Text,
        language -> Text,
        prod_type -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    product_versions (id) {
        id -> Integer,
        group_id -> Text,
        artifact_id -> Text,
        version -> Text,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(artefacts, product_versions,);
