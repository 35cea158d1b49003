//! Server URL validation.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ApiError;

const ACCEPTED_FORMAT: &str = "accepted server url format: http(s)://hostname[:port]";

/// Base URL of a control plane, always `http` or `https` with a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrl(Url);

impl ServerUrl {
    pub fn parse(input: &str) -> Result<Self, ApiError> {
        let url = Url::parse(input.trim())
            .map_err(|e| ApiError::InvalidServer(format!("{input}: {e}; {ACCEPTED_FORMAT}")))?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ApiError::InvalidServer(format!("{input}: {ACCEPTED_FORMAT}")));
        }

        Ok(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Build `<server>/v1/<segments...>`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.0.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidServer(self.0.to_string()))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }
}

impl FromStr for ServerUrl {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
