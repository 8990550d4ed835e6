//! Repository references: `owner/repo[@ref]`.

use std::fmt;
use std::str::FromStr;

use crate::error::{FetchError, FetchResult};

/// Ref used when none is given.
pub const DEFAULT_REF: &str = "HEAD";

/// A validated repository and ref on the code host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    owner: String,
    name: String,
    git_ref: String,
}

impl RepoRef {
    /// Build a reference from parts. A `None` ref means [`DEFAULT_REF`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRepo`] if any part violates the host's
    /// naming rules.
    pub fn new(owner: &str, name: &str, git_ref: Option<&str>) -> FetchResult<Self> {
        validate_component(owner, "owner")?;
        validate_component(name, "repository")?;
        let git_ref = match git_ref {
            Some(r) => {
                validate_git_ref(r)?;
                r.to_owned()
            },
            None => DEFAULT_REF.to_owned(),
        };
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
            git_ref,
        })
    }

    /// Parse `owner/repo` or `owner/repo@ref`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRepo`] for malformed input.
    pub fn parse(input: &str) -> FetchResult<Self> {
        let (path, git_ref) = match input.split_once('@') {
            Some((path, r)) if !r.is_empty() => (path, Some(r)),
            Some((path, _)) => (path, None),
            None => (input, None),
        };
        let Some((owner, name)) = path.split_once('/') else {
            return Err(FetchError::InvalidRepo(format!(
                "expected 'owner/repo[@ref]', got '{input}'"
            )));
        };
        let name = name.strip_suffix(".git").unwrap_or(name);
        Self::new(owner, name, git_ref)
    }

    /// Repository owner (user or organization).
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Branch, tag, commit, or [`DEFAULT_REF`].
    #[must_use]
    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    /// `owner/name` without the ref.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.git_ref)
    }
}

impl FromStr for RepoRef {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Owner and repository names: ASCII alphanumerics, `-`, `_`, `.`.
fn validate_component(value: &str, label: &str) -> FetchResult<()> {
    if value.is_empty() || value.len() > 100 {
        return Err(FetchError::InvalidRepo(format!(
            "{label} must be 1-100 characters, got {}",
            value.len()
        )));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(FetchError::InvalidRepo(format!(
            "{label} contains invalid characters: '{value}'"
        )));
    }
    if value.starts_with('.') || value.starts_with('-') || value.contains("..") {
        return Err(FetchError::InvalidRepo(format!(
            "{label} has invalid format: '{value}'"
        )));
    }
    Ok(())
}

fn validate_git_ref(git_ref: &str) -> FetchResult<()> {
    if git_ref.is_empty() || git_ref.len() > 256 {
        return Err(FetchError::InvalidRepo(
            "ref must be 1-256 characters".into(),
        ));
    }
    if !git_ref
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/'))
    {
        return Err(FetchError::InvalidRepo(format!(
            "ref contains invalid characters: '{git_ref}'"
        )));
    }
    if git_ref.contains("..")
        || git_ref.contains("//")
        || git_ref.starts_with(['-', '.', '/'])
        || git_ref.ends_with(['.', '/'])
        || git_ref.ends_with(".lock")
    {
        return Err(FetchError::InvalidRepo(format!(
            "ref has invalid format: '{git_ref}'"
        )));
    }
    Ok(())
}
