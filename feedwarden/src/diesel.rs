pub mod schema {
    diesel::table! {
      feeds (id) {
          id -> Int4,
          address -> VarChar,
          aggregator_address -> Nullable<VarChar>,
          description -> VarChar,
          chain_id -> Int8,
          status -> VarChar,
          ignored -> Bool,
          created_at -> Timestamptz,
      }
    }
}
