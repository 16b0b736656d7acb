use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Delivery service routing kinds, resolved from the `type` table by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DsKind {
    Http,
    HttpNoCache,
    HttpLive,
    HttpLiveNatnl,
    Dns,
    DnsLive,
    DnsLiveNatnl,
    AnyMap,
    Steering,
    ClientSteering,
}

impl DsKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "HTTP" => Self::Http,
            "HTTP_NO_CACHE" => Self::HttpNoCache,
            "HTTP_LIVE" => Self::HttpLive,
            "HTTP_LIVE_NATNL" => Self::HttpLiveNatnl,
            "DNS" => Self::Dns,
            "DNS_LIVE" => Self::DnsLive,
            "DNS_LIVE_NATNL" => Self::DnsLiveNatnl,
            "ANY_MAP" => Self::AnyMap,
            "STEERING" => Self::Steering,
            "CLIENT_STEERING" => Self::ClientSteering,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::HttpNoCache => "HTTP_NO_CACHE",
            Self::HttpLive => "HTTP_LIVE",
            Self::HttpLiveNatnl => "HTTP_LIVE_NATNL",
            Self::Dns => "DNS",
            Self::DnsLive => "DNS_LIVE",
            Self::DnsLiveNatnl => "DNS_LIVE_NATNL",
            Self::AnyMap => "ANY_MAP",
            Self::Steering => "STEERING",
            Self::ClientSteering => "CLIENT_STEERING",
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http | Self::HttpNoCache | Self::HttpLive | Self::HttpLiveNatnl)
    }

    pub fn is_steering(&self) -> bool { matches!(self, Self::Steering | Self::ClientSteering) }

    /// Kinds whose traffic goes through caches and can therefore use a topology.
    pub fn uses_caches(&self) -> bool { !self.is_steering() && *self != Self::AnyMap }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequestHandling {
    DontCache = 0,
    BackgroundFetch = 1,
    CacheRangeRequests = 2,
    Slice = 3,
}

impl RangeRequestHandling {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::DontCache),
            1 => Some(Self::BackgroundFetch),
            2 => Some(Self::CacheRangeRequests),
            3 => Some(Self::Slice),
            _ => None,
        }
    }
}

pub const MAX_PROTOCOL: i32 = 3;
pub const MAX_QSTRING_IGNORE: i32 = 2;
pub const MAX_GEO_LIMIT: i32 = 2;
pub const SIGNING_ALGORITHMS: [&str; 2] = ["url_sig", "uri_signing"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole {
    Edge,
    Mid,
    Origin,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: i32,
    pub host_name: String,
    pub cdn_id: i32,
    pub cache_group: String,
    pub type_name: String,
    pub capabilities: Vec<String>,
}

impl Server {
    pub fn role(&self) -> ServerRole {
        let t = self.type_name.to_ascii_uppercase();
        if t.starts_with("EDGE") {
            ServerRole::Edge
        } else if t.starts_with("MID") {
            ServerRole::Mid
        } else if t.starts_with("ORG") {
            ServerRole::Origin
        } else {
            ServerRole::Other
        }
    }
}

impl From<models::server::Model> for Server {
    fn from(m: models::server::Model) -> Self {
        Self {
            id: m.id,
            host_name: m.host_name,
            cdn_id: m.cdn_id,
            cache_group: m.cachegroup,
            type_name: m.type_name,
            capabilities: models::split_list(&m.capabilities),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    pub name: String,
    pub cache_groups: Vec<String>,
}

/// Every business field of a delivery service, fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceFields {
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
    pub geo_limit_countries: Vec<String>,
    pub geo_provider: i32,
    pub initial_dispersion: i32,
    pub ipv6_routing_enabled: bool,
    pub logs_enabled: bool,
    pub max_dns_answers: Option<i32>,
    pub max_origin_connections: Option<i32>,
    pub max_request_header_bytes: Option<i32>,
    pub miss_lat: f64,
    pub miss_long: f64,
    pub multi_site_origin: bool,
    pub org_server_fqdn: Option<String>,
    pub protocol: i32,
    pub qstring_ignore: i32,
    pub range_request_handling: i32,
    pub range_slice_block_size: Option<i32>,
    pub regional_geo_blocking: bool,
    pub remap_text: Option<String>,
    pub routing_name: String,
    pub topology: Option<String>,
    pub edge_header_rewrite: Option<String>,
    pub mid_header_rewrite: Option<String>,
    pub first_header_rewrite: Option<String>,
    pub inner_header_rewrite: Option<String>,
    pub last_header_rewrite: Option<String>,
    pub long_desc: Option<String>,
    pub long_desc1: Option<String>,
    pub long_desc2: Option<String>,
    pub long_desc3: Option<String>,
    pub tls_versions: Vec<String>,
    pub required_capabilities: Vec<String>,
    pub consistent_hash_regex: Option<String>,
    pub consistent_hash_query_params: Vec<String>,
    pub fq_pacing_rate: Option<i32>,
    pub signing_algorithm: Option<String>,
    pub tr_request_headers: Option<String>,
    pub tr_response_headers: Option<String>,
}

/// A stored delivery service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryService {
    pub id: i32,
    pub last_updated: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: DeliveryServiceFields,
}

impl DeliveryService {
    pub fn etag(&self) -> String { crate::conditional::etag(self.last_updated) }
}

/// Request body for create and update. Absent fields are `None`; for nullable
/// fields an explicit JSON `null` is `Some(None)` and clears the value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryServiceInput {
    pub xml_id: Option<String>,
    pub tenant_id: Option<i32>,
    pub cdn_id: Option<i32>,
    pub type_id: Option<i32>,
    #[serde(deserialize_with = "double_option")]
    pub profile_id: Option<Option<i32>>,
    #[serde(deserialize_with = "double_option")]
    pub service_category: Option<Option<String>>,
    pub display_name: Option<String>,
    pub active: Option<bool>,
    pub dscp: Option<i32>,
    pub geo_limit: Option<i32>,
    #[serde(deserialize_with = "string_or_list")]
    pub geo_limit_countries: Option<Vec<String>>,
    pub geo_provider: Option<i32>,
    pub initial_dispersion: Option<i32>,
    pub ipv6_routing_enabled: Option<bool>,
    pub logs_enabled: Option<bool>,
    #[serde(deserialize_with = "double_option")]
    pub max_dns_answers: Option<Option<i32>>,
    #[serde(deserialize_with = "double_option")]
    pub max_origin_connections: Option<Option<i32>>,
    #[serde(deserialize_with = "double_option")]
    pub max_request_header_bytes: Option<Option<i32>>,
    pub miss_lat: Option<f64>,
    pub miss_long: Option<f64>,
    pub multi_site_origin: Option<bool>,
    #[serde(deserialize_with = "double_option")]
    pub org_server_fqdn: Option<Option<String>>,
    pub protocol: Option<i32>,
    pub qstring_ignore: Option<i32>,
    pub range_request_handling: Option<i32>,
    #[serde(deserialize_with = "double_option")]
    pub range_slice_block_size: Option<Option<i32>>,
    pub regional_geo_blocking: Option<bool>,
    #[serde(deserialize_with = "double_option")]
    pub remap_text: Option<Option<String>>,
    pub routing_name: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub topology: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub edge_header_rewrite: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub mid_header_rewrite: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub first_header_rewrite: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub inner_header_rewrite: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub last_header_rewrite: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub long_desc: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub long_desc1: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub long_desc2: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub long_desc3: Option<Option<String>>,
    #[serde(deserialize_with = "string_or_list")]
    pub tls_versions: Option<Vec<String>>,
    #[serde(deserialize_with = "string_or_list")]
    pub required_capabilities: Option<Vec<String>>,
    #[serde(deserialize_with = "double_option")]
    pub consistent_hash_regex: Option<Option<String>>,
    #[serde(deserialize_with = "string_or_list")]
    pub consistent_hash_query_params: Option<Vec<String>>,
    #[serde(deserialize_with = "double_option")]
    pub fq_pacing_rate: Option<Option<i32>>,
    #[serde(deserialize_with = "double_option")]
    pub signing_algorithm: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub tr_request_headers: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub tr_response_headers: Option<Option<String>>,
}

/// Present-but-null becomes `Some(None)`; absence is handled by `#[serde(default)]`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Accepts `"US,CA"`, `["US","CA"]` or `null` (which clears the set).
///
/// Array items that are numbers or booleans are kept as their text so the
/// validator can report them instead of failing the whole body.
fn string_or_list<'de, D>(de: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(de)?;
    let items = match raw {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::String(s)) => models::split_list(&s),
        Some(serde_json::Value::Array(values)) => values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => Ok(s.trim().to_string()),
                serde_json::Value::Number(n) => Ok(n.to_string()),
                serde_json::Value::Bool(b) => Ok(b.to_string()),
                other => Err(de::Error::custom(format!("unexpected list item {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(de::Error::custom(format!("expected a string or an array, got {other}"))),
    };
    Ok(Some(items))
}

macro_rules! merge {
    ($target:ident, $patch:ident; $($field:ident),* $(,)?) => {
        $( if let Some(v) = $patch.$field { $target.$field = v; } )*
    };
}

impl DeliveryServiceInput {
    /// Overlay the supplied fields onto `base`.
    pub fn merge_into(self, mut base: DeliveryServiceFields) -> DeliveryServiceFields {
        let p = self;
        merge!(base, p;
            xml_id, tenant_id, cdn_id, type_id, profile_id, service_category, display_name, active,
            dscp, geo_limit, geo_limit_countries, geo_provider, initial_dispersion,
            ipv6_routing_enabled, logs_enabled, max_dns_answers, max_origin_connections,
            max_request_header_bytes, miss_lat, miss_long, multi_site_origin, org_server_fqdn,
            protocol, qstring_ignore, range_request_handling, range_slice_block_size,
            regional_geo_blocking, remap_text, routing_name, topology, edge_header_rewrite,
            mid_header_rewrite, first_header_rewrite, inner_header_rewrite, last_header_rewrite,
            long_desc, long_desc1, long_desc2, long_desc3, tls_versions, required_capabilities,
            consistent_hash_regex, consistent_hash_query_params, fq_pacing_rate, signing_algorithm,
            tr_request_headers, tr_response_headers,
        );
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_clears_and_absent_keeps() {
        let input: DeliveryServiceInput =
            serde_json::from_str(r#"{"topology": null, "geoLimitCountries": "US, CA"}"#).unwrap();
        assert_eq!(input.topology, Some(None));
        assert_eq!(input.edge_header_rewrite, None);
        assert_eq!(input.geo_limit_countries, Some(vec!["US".to_string(), "CA".to_string()]));
    }

    #[test]
    fn country_list_keeps_numbers_for_validation() {
        let input: DeliveryServiceInput = serde_json::from_str(r#"{"geoLimitCountries": ["US", 1]}"#).unwrap();
        assert_eq!(input.geo_limit_countries, Some(vec!["US".to_string(), "1".to_string()]));
        assert!(serde_json::from_str::<DeliveryServiceInput>(r#"{"geoLimitCountries": 7}"#).is_err());
    }

    #[test]
    fn server_role_from_type_prefix() {
        let mut s = Server {
            id: 1,
            host_name: "h".into(),
            cdn_id: 1,
            cache_group: "cg".into(),
            type_name: "EDGE_TIER".into(),
            capabilities: vec![],
        };
        assert_eq!(s.role(), ServerRole::Edge);
        s.type_name = "ORG".into();
        assert_eq!(s.role(), ServerRole::Origin);
        s.type_name = "MID".into();
        assert_eq!(s.role(), ServerRole::Mid);
        s.type_name = "RASCAL".into();
        assert_eq!(s.role(), ServerRole::Other);
    }

    #[test]
    fn kinds_route_through_caches() {
        assert!(DsKind::Http.uses_caches());
        assert!(DsKind::DnsLive.uses_caches());
        assert!(!DsKind::ClientSteering.uses_caches());
        assert!(!DsKind::AnyMap.uses_caches());
        assert_eq!(DsKind::from_name("CLIENT_STEERING"), Some(DsKind::ClientSteering));
        assert_eq!(DsKind::from_name("EDGE"), None);
    }
}
