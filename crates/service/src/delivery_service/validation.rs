//! Cross-field consistency rules for a candidate delivery service.
//!
//! `validate` is pure: every lookup it needs is resolved beforehand into a
//! [`ValidationContext`]. All rules run; the result lists every violation.

use std::collections::HashSet;

use configs::RulesConfig;

use crate::errors::FieldError;

use super::domain::{
    DeliveryService, DeliveryServiceFields, DsKind, RangeRequestHandling, Server, ServerRole, Topology,
    MAX_GEO_LIMIT, MAX_PROTOCOL, MAX_QSTRING_IGNORE, SIGNING_ALGORITHMS,
};

/// Result of resolving the candidate's topology reference.
#[derive(Debug, Clone, Default)]
pub enum TopologyLookup {
    /// Topology rules do not need to run for this change.
    #[default]
    NotRequested,
    Missing,
    /// The topology and every server placed in one of its cache groups, across all CDNs.
    Found { topology: Topology, caches: Vec<Server> },
}

/// Pre-resolved facts about the world the candidate must be consistent with.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    pub rules: &'a RulesConfig,
    /// Kind of `type_id`; `None` if it names no delivery service type.
    pub kind: Option<DsKind>,
    pub cdn_exists: bool,
    /// Another delivery service already uses the candidate's `xml_id`.
    pub xml_id_taken: bool,
    /// The acting tenant may own records of the candidate's `tenant_id`.
    pub tenant_permitted: bool,
    pub topology: TopologyLookup,
    /// Servers currently assigned to the delivery service (empty on create).
    pub assigned: &'a [Server],
}

/// Which header-rewrite family a record populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteFamily {
    Unset,
    Legacy,
    TopologyBased,
    Mixed,
}

/// Shape of the long-description fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Description {
    Unset,
    Primary,
    Deprecated,
    /// Primary together with a deprecated field, or several deprecated fields.
    Collision,
}

fn populated(v: &Option<String>) -> bool {
    v.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn rewrite_family(f: &DeliveryServiceFields) -> RewriteFamily {
    let legacy = populated(&f.edge_header_rewrite) || populated(&f.mid_header_rewrite);
    let topo = populated(&f.first_header_rewrite)
        || populated(&f.inner_header_rewrite)
        || populated(&f.last_header_rewrite);
    match (legacy, topo) {
        (false, false) => RewriteFamily::Unset,
        (true, false) => RewriteFamily::Legacy,
        (false, true) => RewriteFamily::TopologyBased,
        (true, true) => RewriteFamily::Mixed,
    }
}

fn description(f: &DeliveryServiceFields) -> Description {
    let deprecated = [&f.long_desc1, &f.long_desc2, &f.long_desc3]
        .into_iter()
        .filter(|v| populated(v))
        .count();
    match (populated(&f.long_desc), deprecated) {
        (false, 0) => Description::Unset,
        (true, 0) => Description::Primary,
        (false, 1) => Description::Deprecated,
        _ => Description::Collision,
    }
}

fn check_name(errs: &mut Vec<FieldError>, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errs.push(FieldError::invalid(field, "must not be empty"));
    } else if value.chars().count() > max {
        errs.push(FieldError::invalid(field, format!("must be at most {max} characters")));
    }
}

fn check_identity(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields, existing: Option<&DeliveryService>, ctx: &ValidationContext) {
    check_name(errs, "xmlId", &f.xml_id, ctx.rules.max_name_length);
    if f.xml_id.chars().any(char::is_whitespace) {
        errs.push(FieldError::invalid("xmlId", "must not contain whitespace"));
    }
    match existing {
        Some(old) if old.fields.xml_id != f.xml_id => {
            errs.push(FieldError::invalid("xmlId", "cannot be changed"));
        }
        _ => {}
    }
    if ctx.xml_id_taken {
        errs.push(FieldError::duplicate("xmlId", format!("a delivery service with xmlId '{}' already exists", f.xml_id)));
    }
    check_name(errs, "displayName", &f.display_name, ctx.rules.max_name_length);
    check_name(errs, "routingName", &f.routing_name, ctx.rules.max_name_length);
    if f.routing_name.contains('.') {
        errs.push(FieldError::invalid("routingName", "must not contain '.'"));
    }
}

fn check_references(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields, ctx: &ValidationContext) {
    if ctx.kind.is_none() {
        errs.push(FieldError::invalid("typeId", format!("no delivery service type with id {}", f.type_id)));
    }
    if !ctx.cdn_exists {
        errs.push(FieldError::invalid("cdnId", format!("no cdn with id {}", f.cdn_id)));
    }
    if !ctx.tenant_permitted {
        errs.push(FieldError::forbidden("tenantId", "user is not authorized to use this tenant"));
    }
}

fn check_scalars(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields, kind: Option<DsKind>) {
    if !(0..=MAX_PROTOCOL).contains(&f.protocol) {
        errs.push(FieldError::invalid("protocol", format!("must be between 0 and {MAX_PROTOCOL}")));
    }
    if !(0..=MAX_QSTRING_IGNORE).contains(&f.qstring_ignore) {
        errs.push(FieldError::invalid("qstringIgnore", format!("must be between 0 and {MAX_QSTRING_IGNORE}")));
    }
    if !(0..=MAX_GEO_LIMIT).contains(&f.geo_limit) {
        errs.push(FieldError::invalid("geoLimit", format!("must be between 0 and {MAX_GEO_LIMIT}")));
    }
    if f.initial_dispersion < 1 {
        errs.push(FieldError::invalid("initialDispersion", "must be at least 1"));
    }
    if !(-90.0..=90.0).contains(&f.miss_lat) {
        errs.push(FieldError::invalid("missLat", "must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&f.miss_long) {
        errs.push(FieldError::invalid("missLong", "must be between -180 and 180"));
    }
    if f.max_origin_connections.is_some_and(|v| v < 0) {
        errs.push(FieldError::invalid("maxOriginConnections", "must not be negative"));
    }
    if kind.is_some_and(|k| k.is_http()) {
        match f.org_server_fqdn.as_deref().map(str::trim) {
            None | Some("") => errs.push(FieldError::invalid("orgServerFqdn", "required for HTTP delivery services")),
            Some(fqdn) if !(fqdn.starts_with("http://") || fqdn.starts_with("https://")) => {
                errs.push(FieldError::invalid("orgServerFqdn", "must start with http:// or https://"))
            }
            Some(_) => {}
        }
    }
    if f.remap_text.as_deref().is_some_and(|t| t.contains('\n') || t.contains('\r')) {
        errs.push(FieldError::invalid("remapText", "must be a single line"));
    }
    if let Some(alg) = f.signing_algorithm.as_deref() {
        if !SIGNING_ALGORITHMS.contains(&alg) {
            errs.push(FieldError::invalid("signingAlgorithm", format!("must be one of {}", SIGNING_ALGORITHMS.join(", "))));
        }
    }
}

fn check_long_description(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields) {
    if description(f) == Description::Collision {
        errs.push(FieldError::invalid(
            "longDesc",
            "longDesc1, longDesc2 and longDesc3 are deprecated; use longDesc alone",
        ));
    }
}

fn check_header_rewrites(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields) {
    let family = rewrite_family(f);
    if f.topology.is_some() {
        if matches!(family, RewriteFamily::Legacy | RewriteFamily::Mixed) {
            for (name, v) in [("edgeHeaderRewrite", &f.edge_header_rewrite), ("midHeaderRewrite", &f.mid_header_rewrite)] {
                if populated(v) {
                    errs.push(FieldError::invalid(name, "cannot be used on a delivery service with a topology"));
                }
            }
        }
    } else if matches!(family, RewriteFamily::TopologyBased | RewriteFamily::Mixed) {
        for (name, v) in [
            ("firstHeaderRewrite", &f.first_header_rewrite),
            ("innerHeaderRewrite", &f.inner_header_rewrite),
            ("lastHeaderRewrite", &f.last_header_rewrite),
        ] {
            if populated(v) {
                errs.push(FieldError::invalid(name, "can only be used on a delivery service with a topology"));
            }
        }
    }
}

fn check_range_requests(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields, rules: &RulesConfig) {
    let Some(mode) = RangeRequestHandling::from_code(f.range_request_handling) else {
        errs.push(FieldError::invalid("rangeRequestHandling", "must be between 0 and 3"));
        return;
    };
    let (min, max) = (rules.range_slice_block_size_min, rules.range_slice_block_size_max);
    match (mode, f.range_slice_block_size) {
        (RangeRequestHandling::Slice, None) => {
            errs.push(FieldError::invalid("rangeSliceBlockSize", "required when rangeRequestHandling is 3 (slice)"));
        }
        (RangeRequestHandling::Slice, Some(size)) if size < min || size > max => {
            errs.push(FieldError::invalid("rangeSliceBlockSize", format!("must be between {min} and {max}")));
        }
        (RangeRequestHandling::Slice, Some(_)) => {}
        (_, Some(_)) => {
            errs.push(FieldError::invalid("rangeSliceBlockSize", "can only be set when rangeRequestHandling is 3 (slice)"));
        }
        (_, None) => {}
    }
}

fn check_geo(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields, rules: &RulesConfig) {
    let bad: Vec<&str> = f
        .geo_limit_countries
        .iter()
        .map(String::as_str)
        .filter(|c| !rules.country_codes.iter().any(|known| known == c))
        .collect();
    if !bad.is_empty() {
        errs.push(FieldError::invalid("geoLimitCountries", format!("invalid country codes: {}", bad.join(", "))));
    }
}

fn valid_tls_version(v: &str) -> bool {
    let mut parts = v.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(major), Some(minor), None) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|b| b.is_ascii_digit())
                && minor.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

fn check_tls(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields, kind: Option<DsKind>) {
    if f.tls_versions.is_empty() {
        return;
    }
    if let Some(k) = kind.filter(DsKind::is_steering) {
        errs.push(FieldError::invalid("tlsVersions", format!("must be empty for {} delivery services", k.name())));
    }
    let mut seen = HashSet::new();
    for v in &f.tls_versions {
        if !valid_tls_version(v) {
            errs.push(FieldError::invalid("tlsVersions", format!("'{v}' is not a valid TLS version")));
        } else if !seen.insert(v.as_str()) {
            errs.push(FieldError::invalid("tlsVersions", format!("'{v}' is listed more than once")));
        }
    }
}

fn check_topology(errs: &mut Vec<FieldError>, f: &DeliveryServiceFields, existing: Option<&DeliveryService>, ctx: &ValidationContext) {
    let Some(name) = f.topology.as_deref() else { return };

    if let Some(k) = ctx.kind.filter(|k| !k.uses_caches()) {
        errs.push(FieldError::invalid("topology", format!("cannot be set for {} delivery services", k.name())));
    }

    let changed = existing.map_or(true, |old| old.fields.topology.as_deref() != Some(name));
    if changed && ctx.assigned.iter().any(|s| s.role() == ServerRole::Origin) {
        errs.push(FieldError::invalid(
            "topology",
            "cannot change the topology while origin servers are assigned to the delivery service",
        ));
    }

    match &ctx.topology {
        TopologyLookup::NotRequested => {}
        TopologyLookup::Missing => {
            errs.push(FieldError::invalid("topology", format!("no such topology '{name}'")));
        }
        TopologyLookup::Found { topology, caches } => {
            let in_cdn: Vec<&Server> = caches
                .iter()
                .filter(|s| s.cdn_id == f.cdn_id && topology.cache_groups.contains(&s.cache_group))
                .collect();
            if in_cdn.is_empty() {
                errs.push(FieldError::invalid(
                    "topology",
                    format!("topology '{name}' has no cache groups with servers in cdn {}", f.cdn_id),
                ));
            } else if !f.required_capabilities.is_empty() {
                let offered: HashSet<&str> = in_cdn
                    .iter()
                    .flat_map(|s| s.capabilities.iter().map(String::as_str))
                    .collect();
                let missing: Vec<&str> = f
                    .required_capabilities
                    .iter()
                    .map(String::as_str)
                    .filter(|c| !offered.contains(c))
                    .collect();
                if !missing.is_empty() {
                    errs.push(FieldError::invalid(
                        "topology",
                        format!("caches in topology '{name}' lack required capabilities: {}", missing.join(", ")),
                    ));
                }
            }
        }
    }
}

/// Validate `candidate`; `existing` is the stored record on update.
pub fn validate(candidate: &DeliveryServiceFields, existing: Option<&DeliveryService>, ctx: &ValidationContext) -> Vec<FieldError> {
    let mut errs = Vec::new();
    check_identity(&mut errs, candidate, existing, ctx);
    check_references(&mut errs, candidate, ctx);
    check_scalars(&mut errs, candidate, ctx.kind);
    check_long_description(&mut errs, candidate);
    check_header_rewrites(&mut errs, candidate);
    check_range_requests(&mut errs, candidate, ctx.rules);
    check_geo(&mut errs, candidate, ctx.rules);
    check_tls(&mut errs, candidate, ctx.kind);
    check_topology(&mut errs, candidate, existing, ctx);
    errs
}

/// Whether topology rules must be (re)evaluated for this change.
pub fn topology_check_needed(candidate: &DeliveryServiceFields, existing: Option<&DeliveryService>) -> bool {
    if candidate.topology.is_none() {
        return false;
    }
    match existing {
        None => true,
        Some(old) => {
            old.fields.topology != candidate.topology
                || old.fields.cdn_id != candidate.cdn_id
                || old.fields.required_capabilities != candidate.required_capabilities
        }
    }
}
