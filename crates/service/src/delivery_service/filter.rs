//! Query-string filters and pagination for `List`.

use std::collections::HashMap;

use crate::errors::ServiceError;
use crate::pagination::{PageRequest, SortValue, Sortable};

use super::domain::DeliveryService;

/// Equality filters over stored delivery services. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryServiceFilter {
    pub id: Option<i32>,
    pub active: Option<bool>,
    pub cdn_id: Option<i32>,
    pub logs_enabled: Option<bool>,
    pub profile_id: Option<i32>,
    pub service_category: Option<String>,
    pub tenant_id: Option<i32>,
    pub topology: Option<String>,
    pub type_id: Option<i32>,
    pub xml_id: Option<String>,
    /// Restrict to tenants visible to this tenant. Applied by the service, not the repository.
    pub accessible_to: Option<i32>,
}

fn parse_int(params: &HashMap<String, String>, key: &str) -> Result<Option<i32>, ServiceError> {
    params
        .get(key)
        .map(|v| {
            v.trim()
                .parse::<i32>()
                .map_err(|_| ServiceError::BadRequest(format!("{key} must be an integer")))
        })
        .transpose()
}

fn parse_bool(params: &HashMap<String, String>, key: &str) -> Result<Option<bool>, ServiceError> {
    params
        .get(key)
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ServiceError::BadRequest(format!("{key} must be true or false"))),
        })
        .transpose()
}

impl DeliveryServiceFilter {
    pub fn matches(&self, ds: &DeliveryService) -> bool {
        let f = &ds.fields;
        self.id.map_or(true, |v| ds.id == v)
            && self.active.map_or(true, |v| f.active == v)
            && self.cdn_id.map_or(true, |v| f.cdn_id == v)
            && self.logs_enabled.map_or(true, |v| f.logs_enabled == v)
            && self.profile_id.map_or(true, |v| f.profile_id == Some(v))
            && self.service_category.as_ref().map_or(true, |v| f.service_category.as_ref() == Some(v))
            && self.tenant_id.map_or(true, |v| f.tenant_id == v)
            && self.topology.as_ref().map_or(true, |v| f.topology.as_ref() == Some(v))
            && self.type_id.map_or(true, |v| f.type_id == v)
            && self.xml_id.as_ref().map_or(true, |v| &f.xml_id == v)
    }
}

/// Everything a `List` call reads from the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: DeliveryServiceFilter,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ServiceError> {
        let text = |k: &str| params.get(k).map(|v| v.to_string());
        let filter = DeliveryServiceFilter {
            id: parse_int(params, "id")?,
            active: parse_bool(params, "active")?,
            cdn_id: parse_int(params, "cdn")?,
            logs_enabled: parse_bool(params, "logsEnabled")?,
            profile_id: parse_int(params, "profile")?,
            service_category: text("serviceCategory"),
            tenant_id: parse_int(params, "tenant")?,
            topology: text("topology"),
            type_id: parse_int(params, "type")?,
            xml_id: text("xmlId"),
            accessible_to: parse_int(params, "accessibleTo")?,
        };
        let page = PageRequest::parse(
            params.get("orderby").map(String::as_str),
            params.get("sortOrder").map(String::as_str),
            params.get("limit").map(String::as_str),
            params.get("offset").map(String::as_str),
            params.get("page").map(String::as_str),
        )?;
        Ok(Self { filter, page })
    }
}

fn opt_text(v: &Option<String>) -> SortValue {
    v.as_ref().map_or(SortValue::Null, |s| SortValue::Text(s.clone()))
}

impl Sortable for DeliveryService {
    const SORT_KEYS: &'static [&'static str] = &[
        "id", "xmlId", "displayName", "tenantId", "cdnId", "typeId", "active", "routingName", "topology", "lastUpdated",
    ];
    const DEFAULT_KEY: &'static str = "xmlId";

    fn sort_value(&self, key: &str) -> SortValue {
        let f = &self.fields;
        match key {
            "id" => SortValue::Int(self.id.into()),
            "displayName" => SortValue::Text(f.display_name.clone()),
            "tenantId" => SortValue::Int(f.tenant_id.into()),
            "cdnId" => SortValue::Int(f.cdn_id.into()),
            "typeId" => SortValue::Int(f.type_id.into()),
            "active" => SortValue::Bool(f.active),
            "routingName" => SortValue::Text(f.routing_name.clone()),
            "topology" => opt_text(&f.topology),
            "lastUpdated" => SortValue::Time(self.last_updated),
            _ => SortValue::Text(f.xml_id.clone()),
        }
    }

    fn tie_breaker(&self) -> i64 { self.id.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_filters_and_window() {
        let q = ListQuery::from_params(&params(&[
            ("cdn", "2"),
            ("active", "TRUE"),
            ("topology", "mso-topology"),
            ("accessibleTo", "3"),
            ("orderby", "id"),
            ("limit", "5"),
            ("page", "2"),
        ]))
        .unwrap();
        assert_eq!(q.filter.cdn_id, Some(2));
        assert_eq!(q.filter.active, Some(true));
        assert_eq!(q.filter.topology.as_deref(), Some("mso-topology"));
        assert_eq!(q.filter.accessible_to, Some(3));
        assert_eq!(q.page.offset, 5);
        assert_eq!(q.page.limit, Some(5));
    }

    #[test]
    fn malformed_filter_values_are_bad_requests() {
        for bad in [("cdn", "two"), ("active", "yes"), ("tenant", "1.5"), ("limit", "-2"), ("offset", "0")] {
            let mut p = params(&[bad]);
            if bad.0 == "offset" {
                p.insert("limit".into(), "1".into());
            }
            assert!(matches!(ListQuery::from_params(&p), Err(ServiceError::BadRequest(_))), "{bad:?}");
        }
    }
}
