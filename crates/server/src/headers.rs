//! Conditional request headers in, cache validators out.

use axum::http::{
    header::{ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_UNMODIFIED_SINCE, LAST_MODIFIED},
    HeaderMap, HeaderName,
};
use chrono::{DateTime, Utc};
use service::conditional::Preconditions;
use service::delivery_service::DeliveryService;

use crate::errors::ApiError;

/// RFC 1123 form, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn parse_http_date(headers: &HeaderMap, name: HeaderName) -> Result<Option<DateTime<Utc>>, ApiError> {
    let Some(raw) = headers.get(&name) else { return Ok(None) };
    let text = raw
        .to_str()
        .map_err(|_| ApiError::bad_request(format!("{name} is not valid text")))?;
    DateTime::parse_from_rfc2822(text.trim())
        .map(|d| Some(d.with_timezone(&Utc)))
        .map_err(|_| ApiError::bad_request(format!("{name} must be an HTTP date, got '{text}'")))
}

fn parse_if_match(headers: &HeaderMap) -> Result<Option<Vec<String>>, ApiError> {
    let mut tags = Vec::new();
    let mut seen = false;
    for value in headers.get_all(IF_MATCH) {
        seen = true;
        let text = value.to_str().map_err(|_| ApiError::bad_request("If-Match is not valid text"))?;
        tags.extend(text.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from));
    }
    if seen && tags.is_empty() {
        return Err(ApiError::bad_request("If-Match must list at least one entity tag"));
    }
    Ok(seen.then_some(tags))
}

/// Malformed dates are rejected rather than ignored.
pub fn preconditions(headers: &HeaderMap) -> Result<Preconditions, ApiError> {
    Ok(Preconditions {
        if_modified_since: parse_http_date(headers, IF_MODIFIED_SINCE)?,
        if_unmodified_since: parse_http_date(headers, IF_UNMODIFIED_SINCE)?,
        if_match: parse_if_match(headers)?,
    })
}

pub fn validators(ds: &DeliveryService) -> [(HeaderName, String); 2] {
    [(ETAG, ds.etag()), (LAST_MODIFIED, http_date(ds.last_updated))]
}
