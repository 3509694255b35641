//! Resource locators of the form `scheme://container/object/path`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed `scheme://container/object` locator.
///
/// Both identity segments are percent-decoded. The object segment may itself
/// contain `/` separators. Either segment may be empty after parsing; use
/// [`require_object`](Self::require_object) before any operation that
/// touches object content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    scheme: String,
    container: String,
    object: String,
}

impl Locator {
    /// Creates a locator from already-decoded parts.
    pub fn new(
        scheme: impl Into<String>,
        container: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            container: container.into(),
            object: object.into(),
        }
    }

    /// Parses and percent-decodes a locator string.
    pub fn parse(input: &str) -> Result<Self> {
        let Some((scheme, rest)) = input.split_once("://") else {
            return Err(Error::invalid_locator(input, "expected 'scheme://'"));
        };

        let valid_scheme = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(Error::invalid_locator(input, "malformed scheme"));
        }

        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (container, object) = rest.split_once('/').unwrap_or((rest, ""));

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            container: decode(input, container)?,
            object: decode(input, object)?,
        })
    }

    /// Returns the scheme, lowercased.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the decoded container identifier.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the decoded object path.
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Whether the locator names a container only.
    pub fn is_container_only(&self) -> bool {
        !self.container.is_empty() && self.object.is_empty()
    }

    /// Ensures both the container and the object segments are present.
    pub fn require_object(&self) -> Result<&Self> {
        if self.container.is_empty() || self.object.is_empty() {
            return Err(Error::MissingResourceIdentifier {
                locator: self.to_string(),
            });
        }
        Ok(self)
    }
}

fn decode(input: &str, segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| Error::invalid_locator(input, e.to_string()))
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}/",
            self.scheme,
            urlencoding::encode(&self.container)
        )?;

        let mut segments = self.object.split('/');
        if let Some(first) = segments.next() {
            f.write_str(&urlencoding::encode(first))?;
        }
        for segment in segments {
            write!(f, "/{}", urlencoding::encode(segment))?;
        }
        Ok(())
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
