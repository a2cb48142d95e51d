//! Repository locator value object.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Suffix commonly appended to clone URLs.
const GIT_SUFFIX: &str = ".git";

/// Repository hosted on a source-hosting service, identified by host, owner
/// and name.
///
/// Parsed from a clone URL such as `https://github.com/owner/repo.git`. The
/// scheme is retained so self-hosted instances served over plain HTTP keep
/// working when the URL is handed to the worker.
///
/// # Examples
///
///     use ghost_coder::task::domain::RepositoryRef;
///
///     let repo = RepositoryRef::parse("https://github.com/octo/widgets.git")
///         .expect("valid locator");
///     assert_eq!(repo.full_name(), "octo/widgets");
///     assert_eq!(repo.clone_url(), "https://github.com/octo/widgets.git");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    scheme: String,
    host: String,
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Parses a repository locator.
    ///
    /// Accepts `http` and `https` URLs with exactly two path segments, an
    /// optional `.git` suffix and an optional trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidRepository`] when the locator is not
    /// a URL, uses another scheme, embeds credentials, carries a query or
    /// fragment, or does not name exactly one owner and repository.
    pub fn parse(locator: &str) -> Result<Self, TaskDomainError> {
        let trimmed = locator.trim();
        let url = Url::parse(trimmed)
            .map_err(|err| TaskDomainError::invalid_repository(locator, err.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TaskDomainError::invalid_repository(
                locator,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(TaskDomainError::invalid_repository(
                locator,
                "credentials must not be embedded in the locator",
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(TaskDomainError::invalid_repository(
                locator,
                "query and fragment are not allowed",
            ));
        }

        let host_name = url
            .host_str()
            .ok_or_else(|| TaskDomainError::invalid_repository(locator, "missing host"))?;
        let host = url
            .port()
            .map_or_else(|| host_name.to_owned(), |port| format!("{host_name}:{port}"));

        let segments: Vec<&str> = url
            .path_segments()
            .map(|parts| parts.filter(|part| !part.is_empty()).collect())
            .unwrap_or_default();
        let [owner, raw_name] = segments.as_slice() else {
            return Err(TaskDomainError::invalid_repository(
                locator,
                "expected a path of the form /owner/repository",
            ));
        };
        let name = raw_name.strip_suffix(GIT_SUFFIX).unwrap_or(raw_name);

        Self::build(url.scheme(), &host, owner, name)
            .map_err(|reason| TaskDomainError::invalid_repository(locator, reason))
    }

    /// Creates an `https` repository reference from its components.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidRepository`] when a component is
    /// empty or contains characters outside `[A-Za-z0-9._-]`.
    pub fn from_parts(host: &str, owner: &str, name: &str) -> Result<Self, TaskDomainError> {
        Self::build("https", host, owner, name).map_err(|reason| {
            TaskDomainError::invalid_repository(format!("{host}/{owner}/{name}"), reason)
        })
    }

    fn build(scheme: &str, host: &str, owner: &str, name: &str) -> Result<Self, String> {
        if host.trim().is_empty() {
            return Err("missing host".to_owned());
        }
        for (label, segment) in [("owner", owner), ("repository name", name)] {
            if !is_valid_segment(segment) {
                return Err(format!("invalid {label} '{segment}'"));
            }
        }
        Ok(Self {
            scheme: scheme.to_owned(),
            host: host.trim().to_ascii_lowercase(),
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Returns the host, including a non-default port when present.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the owning user or organisation.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name without any `.git` suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `owner/name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Returns the normalized clone URL handed to the worker.
    #[must_use]
    pub fn clone_url(&self) -> String {
        format!(
            "{}://{}/{}/{}{GIT_SUFFIX}",
            self.scheme, self.host, self.owner, self.name
        )
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

impl TryFrom<&str> for RepositoryRef {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
}
