// Hand-written to match §3's data model; not generated by `diesel print-schema`
// since this store has no migrations directory checked in yet (see DESIGN.md).

diesel::table! {
  zones (id) {
    id -> Int4,
    #[max_length = 64]
    name -> Varchar,
  }
}

diesel::table! {
  interfaces (id) {
    id -> Int4,
    #[max_length = 64]
    name -> Varchar,
  }
}

diesel::table! {
  jobs (id) {
    id -> Int8,
    #[max_length = 64]
    source_code -> Varchar,
    target_date -> Date,
    started_at -> Timestamp,
    finished_at -> Nullable<Timestamp>,
    #[max_length = 16]
    status -> Varchar,
    rows_inserted -> Int8,
    rows_updated -> Int8,
    error_text -> Nullable<Text>,
  }
}

diesel::table! {
  log_lines (id) {
    id -> Int8,
    job_id -> Int8,
    #[max_length = 16]
    level -> Varchar,
    ts -> Timestamp,
    message -> Text,
  }
}

diesel::table! {
  rt_lbmp (ts, zone_id) {
    ts -> Timestamp,
    zone_id -> Int4,
    lbmp -> Nullable<Float8>,
    marginal_cost_congestion -> Nullable<Float8>,
    marginal_cost_losses -> Nullable<Float8>,
  }
}

diesel::table! {
  da_lbmp (ts, zone_id) {
    ts -> Timestamp,
    zone_id -> Int4,
    lbmp -> Nullable<Float8>,
    marginal_cost_congestion -> Nullable<Float8>,
    marginal_cost_losses -> Nullable<Float8>,
  }
}

diesel::table! {
  tw_lbmp (ts, zone_id) {
    ts -> Timestamp,
    zone_id -> Int4,
    lbmp -> Nullable<Float8>,
    marginal_cost_congestion -> Nullable<Float8>,
    marginal_cost_losses -> Nullable<Float8>,
  }
}

diesel::table! {
  rt_load (ts, zone_id) {
    ts -> Timestamp,
    zone_id -> Int4,
    load_mw -> Nullable<Float8>,
  }
}

diesel::table! {
  load_forecast (ts, zone_id) {
    ts -> Timestamp,
    zone_id -> Int4,
    forecast_mw -> Nullable<Float8>,
  }
}

diesel::table! {
  interface_flow (ts, interface_id) {
    ts -> Timestamp,
    interface_id -> Int4,
    flow_mw -> Nullable<Float8>,
    pos_limit_mw -> Nullable<Float8>,
    neg_limit_mw -> Nullable<Float8>,
  }
}

diesel::table! {
  ancillary (ts, zone_id, market, service_type) {
    ts -> Timestamp,
    zone_id -> Int4,
    #[max_length = 32]
    market -> Varchar,
    #[max_length = 32]
    service_type -> Varchar,
    price -> Nullable<Float8>,
  }
}

diesel::table! {
  constraint (ts, constraint_name, market) {
    ts -> Timestamp,
    #[max_length = 32]
    market -> Varchar,
    #[max_length = 128]
    constraint_name -> Varchar,
    shadow_price -> Nullable<Float8>,
    binding -> Nullable<Bool>,
    limit_mw -> Nullable<Float8>,
    flow_mw -> Nullable<Float8>,
  }
}

diesel::table! {
  external_rto_price (ts, rto) {
    ts -> Timestamp,
    #[max_length = 32]
    rto -> Varchar,
    rtc_price -> Nullable<Float8>,
    cts_price -> Nullable<Float8>,
    price_diff -> Nullable<Float8>,
  }
}

diesel::table! {
  atc_ttc (ts, interface_id, forecast_type, direction) {
    ts -> Timestamp,
    interface_id -> Int4,
    #[max_length = 32]
    forecast_type -> Varchar,
    atc_mw -> Nullable<Float8>,
    ttc_mw -> Nullable<Float8>,
    trm_mw -> Nullable<Float8>,
    #[max_length = 16]
    direction -> Varchar,
  }
}

diesel::table! {
  outage (ts, outage_type, resource_name) {
    ts -> Timestamp,
    #[max_length = 32]
    outage_type -> Varchar,
    #[max_length = 32]
    market -> Varchar,
    #[max_length = 128]
    resource_name -> Varchar,
    #[max_length = 64]
    resource_type -> Nullable<Varchar>,
    mw_capacity -> Nullable<Float8>,
    mw_outage -> Nullable<Float8>,
    start_t -> Nullable<Timestamp>,
    end_t -> Nullable<Timestamp>,
    #[max_length = 32]
    status -> Nullable<Varchar>,
  }
}

diesel::table! {
  weather (ts, forecast_ts, location) {
    ts -> Timestamp,
    forecast_ts -> Timestamp,
    #[max_length = 64]
    location -> Varchar,
    temp_f -> Nullable<Float8>,
    humidity -> Nullable<Float8>,
    wind_mph -> Nullable<Float8>,
    #[max_length = 8]
    wind_dir -> Nullable<Varchar>,
    cloud_pct -> Nullable<Float8>,
  }
}

diesel::table! {
  fuel_mix (ts, fuel_type) {
    ts -> Timestamp,
    #[max_length = 32]
    fuel_type -> Varchar,
    generation_mw -> Nullable<Float8>,
    pct -> Nullable<Float8>,
  }
}

diesel::table! {
  advisory (ts, advisory_type, title) {
    ts -> Timestamp,
    #[max_length = 32]
    advisory_type -> Varchar,
    #[max_length = 256]
    title -> Varchar,
    message -> Nullable<Text>,
    #[max_length = 16]
    severity -> Nullable<Varchar>,
  }
}

diesel::joinable!(log_lines -> jobs (job_id));
diesel::joinable!(rt_lbmp -> zones (zone_id));
diesel::joinable!(da_lbmp -> zones (zone_id));
diesel::joinable!(tw_lbmp -> zones (zone_id));
diesel::joinable!(rt_load -> zones (zone_id));
diesel::joinable!(load_forecast -> zones (zone_id));
diesel::joinable!(ancillary -> zones (zone_id));
diesel::joinable!(interface_flow -> interfaces (interface_id));
diesel::joinable!(atc_ttc -> interfaces (interface_id));

diesel::allow_tables_to_appear_in_same_query!(
  zones,
  interfaces,
  jobs,
  log_lines,
  rt_lbmp,
  da_lbmp,
  tw_lbmp,
  rt_load,
  load_forecast,
  interface_flow,
  ancillary,
  constraint,
  external_rto_price,
  atc_ttc,
  outage,
  weather,
  fuel_mix,
  advisory,
);
