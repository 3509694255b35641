//! Header names, URL building and response metadata parsing.

use jiff::Timestamp;
use nvisy_stream::store::{ObjectInfo, Visibility};
use reqwest::header::{CONTENT_LENGTH, HeaderMap, LAST_MODIFIED};
use url::Url;

use crate::error::Result;

pub(crate) const AUTH_USER: &str = "X-Auth-User";
pub(crate) const AUTH_KEY: &str = "X-Auth-Key";
pub(crate) const AUTH_TOKEN: &str = "X-Auth-Token";
pub(crate) const STORAGE_URL: &str = "X-Storage-Url";
pub(crate) const CONTAINER_READ: &str = "X-Container-Read";
const TIMESTAMP: &str = "X-Timestamp";

/// Referrer ACL element granting anonymous reads.
const PUBLIC_READ: &str = ".r:*";

/// Builds `{storage}/{container}[/{object}]`, percent-encoding each segment.
pub(crate) fn resource_url(storage: &Url, container: &str, object: Option<&str>) -> Result<Url> {
    let mut url = format!(
        "{}/{}",
        storage.as_str().trim_end_matches('/'),
        urlencoding::encode(container)
    );
    if let Some(object) = object {
        for segment in object.split('/') {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
    }
    Ok(Url::parse(&url)?)
}

/// Maps a container read ACL to a visibility.
pub(crate) fn visibility(read_acl: Option<&str>) -> Visibility {
    let public = read_acl
        .into_iter()
        .flat_map(|acl| acl.split(','))
        .any(|element| element.trim() == PUBLIC_READ);
    if public {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

/// Reads a header as a string.
pub(crate) fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Builds object metadata from response headers.
///
/// `body_len` is used when the response carries no `Content-Length`.
pub(crate) fn object_info(name: &str, headers: &HeaderMap, body_len: Option<u64>) -> ObjectInfo {
    let content_length = header(headers, CONTENT_LENGTH.as_str())
        .and_then(|v| v.parse().ok())
        .or(body_len)
        .unwrap_or_default();

    ObjectInfo {
        name: name.to_owned(),
        content_length,
        last_modified: last_modified(headers),
    }
}

/// Parses `Last-Modified` (RFC 2822), falling back to `X-Timestamp`.
pub(crate) fn last_modified(headers: &HeaderMap) -> Option<Timestamp> {
    let http_date = header(headers, LAST_MODIFIED.as_str())
        .and_then(|v| jiff::fmt::rfc2822::parse(v).ok())
        .map(|zoned| zoned.timestamp());

    http_date.or_else(|| {
        let raw = header(headers, TIMESTAMP)?;
        let seconds = raw.split('.').next()?.parse().ok()?;
        Timestamp::from_second(seconds).ok()
    })
}
