//! The `deliveryservice` table.
//!
//! Set-valued fields (`geo_limit_countries`, `tls_versions`,
//! `required_capabilities`, `consistent_hash_query_params`) are stored as comma
//! separated text; see [`crate::split_list`].
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deliveryservice")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub xml_id: String,
    pub tenant_id: i32,
    pub cdn_id: i32,
    pub type_id: i32,
    pub profile_id: Option<i32>,
    pub service_category: Option<String>,
    pub display_name: String,
    pub active: bool,
    pub dscp: i32,
    pub geo_limit: i32,
    pub geo_limit_countries: String,
    pub geo_provider: i32,
    pub initial_dispersion: i32,
    pub ipv6_routing_enabled: bool,
    pub logs_enabled: bool,
    pub max_dns_answers: Option<i32>,
    pub max_origin_connections: Option<i32>,
    pub max_request_header_bytes: Option<i32>,
    #[sea_orm(column_type = "Double")]
    pub miss_lat: f64,
    #[sea_orm(column_type = "Double")]
    pub miss_long: f64,
    pub multi_site_origin: bool,
    pub org_server_fqdn: Option<String>,
    pub protocol: i32,
    pub qstring_ignore: i32,
    pub range_request_handling: i32,
    pub range_slice_block_size: Option<i32>,
    pub regional_geo_blocking: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub remap_text: Option<String>,
    pub routing_name: String,
    pub topology: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub edge_header_rewrite: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub mid_header_rewrite: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub first_header_rewrite: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub inner_header_rewrite: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_header_rewrite: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_desc: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_desc1: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_desc2: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_desc3: Option<String>,
    pub tls_versions: String,
    pub required_capabilities: String,
    pub consistent_hash_regex: Option<String>,
    pub consistent_hash_query_params: String,
    pub fq_pacing_rate: Option<i32>,
    pub signing_algorithm: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub tr_request_headers: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub tr_response_headers: Option<String>,
    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
