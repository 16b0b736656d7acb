//! Default-filling pass run on create, before validation.

use configs::RulesConfig;

use crate::errors::FieldError;

use super::domain::{DeliveryServiceFields, DeliveryServiceInput};

/// A defaulted create body together with the required fields it lacked.
#[derive(Debug, Clone)]
pub struct Defaulted {
    /// Fully populated record; missing required fields hold empty strings or id 0.
    pub fields: DeliveryServiceFields,
    pub missing: Vec<FieldError>,
}

impl Defaulted {
    /// The record, provided no required field was missing.
    pub fn complete(self) -> Result<DeliveryServiceFields, Vec<FieldError>> {
        if self.missing.is_empty() { Ok(self.fields) } else { Err(self.missing) }
    }
}

/// Turn a create body into a fully populated record.
///
/// Always yields a record so the consistency rules can run on it; missing
/// required fields are collected alongside rather than returned early.
pub fn fill_for_create(input: DeliveryServiceInput, rules: &RulesConfig) -> Defaulted {
    let mut missing = Vec::new();
    let xml_id = required_text(&mut missing, "xmlId", &input.xml_id);
    let tenant_id = required_id(&mut missing, "tenantId", input.tenant_id);
    let cdn_id = required_id(&mut missing, "cdnId", input.cdn_id);
    let type_id = required_id(&mut missing, "typeId", input.type_id);
    let display_name = required_text(&mut missing, "displayName", &input.display_name);

    let base = DeliveryServiceFields {
        xml_id,
        tenant_id,
        cdn_id,
        type_id,
        profile_id: None,
        service_category: None,
        display_name,
        active: true,
        dscp: 0,
        geo_limit: 0,
        geo_limit_countries: Vec::new(),
        geo_provider: 0,
        initial_dispersion: 1,
        ipv6_routing_enabled: false,
        logs_enabled: false,
        max_dns_answers: None,
        max_origin_connections: None,
        max_request_header_bytes: None,
        miss_lat: 0.0,
        miss_long: 0.0,
        multi_site_origin: false,
        org_server_fqdn: None,
        protocol: 0,
        qstring_ignore: 0,
        range_request_handling: 0,
        range_slice_block_size: None,
        regional_geo_blocking: false,
        remap_text: None,
        routing_name: rules.default_routing_name.clone(),
        topology: None,
        edge_header_rewrite: None,
        mid_header_rewrite: None,
        first_header_rewrite: None,
        inner_header_rewrite: None,
        last_header_rewrite: None,
        long_desc: None,
        long_desc1: None,
        long_desc2: None,
        long_desc3: None,
        tls_versions: Vec::new(),
        required_capabilities: Vec::new(),
        consistent_hash_regex: None,
        consistent_hash_query_params: Vec::new(),
        fq_pacing_rate: None,
        signing_algorithm: None,
        tr_request_headers: None,
        tr_response_headers: None,
    };
    Defaulted { fields: input.merge_into(base), missing }
}

fn required_text(missing: &mut Vec<FieldError>, field: &str, value: &Option<String>) -> String {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v.to_owned(),
        _ => {
            missing.push(FieldError::invalid(field, "required"));
            String::new()
        }
    }
}

fn required_id(missing: &mut Vec<FieldError>, field: &str, value: Option<i32>) -> i32 {
    value.unwrap_or_else(|| {
        missing.push(FieldError::invalid(field, "required"));
        0
    })
}
