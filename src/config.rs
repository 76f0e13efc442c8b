//! Work-item configuration.
//!
//! Every recognized option and its effect lives in one explicit struct,
//! validated when the item is built and never re-interpreted per step.
//! The TOML batch file (`[defaults]` + `[[repos]]`) lowers into the same
//! validated [`WorkItem`]s the CLI builds from flags.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::timeline::{DateInterval, TimelineError};

/// Substitute author/committer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(ValidationError::EmptyIdentityField);
        }
        Ok(Self { name, email })
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Compiled content-scrub rules.
///
/// Patterns are compiled case-insensitively once, here, so a bad pattern
/// fails the item before anything is cloned.
#[derive(Debug, Clone)]
pub struct ScrubSpec {
    pub patterns: Vec<Regex>,
    pub replacement: String,
}

impl ScrubSpec {
    pub fn new(
        patterns: &[String],
        replacement: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| ValidationError::BadPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            compiled.push(regex);
        }
        Ok(Self {
            patterns: compiled,
            replacement: replacement.into(),
        })
    }
}

/// Where the rewritten history ends up.
#[derive(Debug, Clone, Default)]
pub enum Destination {
    /// Keep the result local; nothing is pushed.
    #[default]
    None,
    /// Force-push to an existing remote repository.
    Url(String),
    /// Create a repository through the hosting API, then force-push.
    Provision {
        token: String,
        /// `{repo}` expands to the source repository name, `{index}` to
        /// the 1-based position in the batch.
        name_template: String,
        private: bool,
    },
}

/// One entry in the batch worklist. Constructed before the batch starts,
/// consumed by the orchestrator, never mutated.
#[derive(Debug, Clone, Default)]
pub struct WorkItem {
    /// Clone URL or local path.
    pub source: String,
    pub identity: Option<Identity>,
    pub randomize: Option<DateInterval>,
    /// Branch renames, old name to new name. `old == new` is a no-op.
    pub renames: BTreeMap<String, String>,
    pub scrub: Option<ScrubSpec>,
    pub destination: Destination,
}

impl WorkItem {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Cross-field validation. Field types carry their own invariants
    /// (compiled patterns, ordered intervals, non-empty identity); this
    /// checks what only the whole item can know.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.trim().is_empty() {
            return Err(ValidationError::EmptySource);
        }
        let mut targets = std::collections::BTreeSet::new();
        for (old, new) in &self.renames {
            if old == new {
                continue;
            }
            if !targets.insert(new.as_str()) {
                return Err(ValidationError::DuplicateRenameTarget(new.clone()));
            }
        }
        match &self.destination {
            Destination::None => {}
            Destination::Url(url) => {
                if url.trim().is_empty() {
                    return Err(ValidationError::EmptyDestinationUrl);
                }
            }
            Destination::Provision {
                token,
                name_template,
                ..
            } => {
                if token.trim().is_empty() {
                    return Err(ValidationError::MissingToken);
                }
                if name_template.trim().is_empty() {
                    return Err(ValidationError::MissingNameTemplate);
                }
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("source locator must not be empty")]
    EmptySource,

    #[error("author name and email must both be non-empty")]
    EmptyIdentityField,

    #[error("author name and email must be provided together")]
    PartialIdentity,

    #[error("invalid scrub pattern `{pattern}`: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("duplicate branch rename target: {0}")]
    DuplicateRenameTarget(String),

    #[error("destination url must not be empty")]
    EmptyDestinationUrl,

    #[error("provisioning a destination requires a token")]
    MissingToken,

    #[error("provisioning a destination requires a repository name template")]
    MissingNameTemplate,
}

// =============================================================================
// Batch file (TOML)
// =============================================================================

/// Optional per-field settings; `[defaults]` and each `[[repos]]` entry
/// share this shape, entry fields winning over defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemLayer {
    pub author: Option<String>,
    pub email: Option<String>,
    pub randomize_dates: Option<bool>,
    /// RFC 3339 timestamp or `yyyy-mm-dd`.
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub replacement: Option<String>,
    /// Branch renames, old name to new name.
    pub branches: Option<BTreeMap<String, String>>,
    pub destination: Option<String>,
    pub token: Option<String>,
    pub name_template: Option<String>,
    pub private: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub defaults: ItemLayer,
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RepoEntry {
    pub url: String,
    #[serde(flatten)]
    pub overrides: ItemLayer,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid timestamp `{0}`: expected rfc3339 or yyyy-mm-dd")]
    BadTimestamp(String),

    #[error("invalid rename `{0}`: expected OLD=NEW")]
    BadRename(String),

    #[error("batch file lists no repositories")]
    NoRepos,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Interval(#[from] TimelineError),
}

/// Load a batch worklist and lower it to validated work items.
pub fn load_batch_file(path: &Path) -> Result<Vec<WorkItem>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: BatchFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if file.repos.is_empty() {
        return Err(ConfigError::NoRepos);
    }
    file.repos
        .iter()
        .map(|entry| work_item_from_layers(&entry.url, &file.defaults, &entry.overrides))
        .collect()
}

/// Merge a defaults layer with one entry's overrides and validate.
pub fn work_item_from_layers(
    url: &str,
    defaults: &ItemLayer,
    overrides: &ItemLayer,
) -> Result<WorkItem, ConfigError> {
    let layer = merge_layers(defaults, overrides);
    let mut item = WorkItem::new(url);

    item.identity = match (layer.author, layer.email) {
        (Some(name), Some(email)) => Some(Identity::new(name, email)?),
        (None, None) => None,
        _ => return Err(ValidationError::PartialIdentity.into()),
    };

    if layer.randomize_dates.unwrap_or(false) {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let start = match layer.date_start {
            Some(raw) => parse_timestamp(&raw)?,
            None => now - 365 * 24 * 60 * 60,
        };
        let end = match layer.date_end {
            Some(raw) => parse_timestamp(&raw)?,
            None => now,
        };
        item.randomize = Some(DateInterval::new(start, end)?);
    }

    if let Some(map) = layer.branches {
        item.renames = map;
    }

    if let Some(patterns) = layer.patterns {
        if !patterns.is_empty() {
            let replacement = layer.replacement.unwrap_or_default();
            item.scrub = Some(ScrubSpec::new(&patterns, replacement)?);
        }
    }

    item.destination = match (layer.destination, layer.token, layer.name_template) {
        (Some(url), _, _) => Destination::Url(url),
        (None, Some(token), Some(name_template)) => Destination::Provision {
            token,
            name_template,
            private: layer.private.unwrap_or(true),
        },
        (None, Some(_), None) => return Err(ValidationError::MissingNameTemplate.into()),
        (None, None, Some(_)) => return Err(ValidationError::MissingToken.into()),
        (None, None, None) => Destination::None,
    };

    item.validate()?;
    Ok(item)
}

fn merge_layers(defaults: &ItemLayer, overrides: &ItemLayer) -> ItemLayer {
    macro_rules! pick {
        ($field:ident) => {
            overrides.$field.clone().or_else(|| defaults.$field.clone())
        };
    }
    ItemLayer {
        author: pick!(author),
        email: pick!(email),
        randomize_dates: pick!(randomize_dates),
        date_start: pick!(date_start),
        date_end: pick!(date_end),
        patterns: pick!(patterns),
        replacement: pick!(replacement),
        branches: pick!(branches),
        destination: pick!(destination),
        token: pick!(token),
        name_template: pick!(name_template),
        private: pick!(private),
    }
}

/// Parse an RFC 3339 timestamp or a bare `yyyy-mm-dd` date (midnight UTC)
/// into unix seconds.
pub fn parse_timestamp(raw: &str) -> Result<i64, ConfigError> {
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(dt.unix_timestamp());
    }
    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(raw, &date_only) {
        return Ok(date.midnight().assume_utc().unix_timestamp());
    }
    Err(ConfigError::BadTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_forms() {
        assert_eq!(parse_timestamp("1970-01-02").unwrap(), 86_400);
        assert_eq!(parse_timestamp("1970-01-01T01:00:00Z").unwrap(), 3_600);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn entry_overrides_win_over_defaults() {
        let toml_src = r#"
            [defaults]
            author = "A"
            email = "a@x.com"
            randomize_dates = true
            date_start = "2020-01-01"
            date_end = "2021-01-01"

            [[repos]]
            url = "https://example.com/one.git"

            [[repos]]
            url = "https://example.com/two.git"
            author = "B"
            email = "b@x.com"
        "#;
        let file: BatchFile = toml::from_str(toml_src).unwrap();
        let one =
            work_item_from_layers(&file.repos[0].url, &file.defaults, &file.repos[0].overrides)
                .unwrap();
        let two =
            work_item_from_layers(&file.repos[1].url, &file.defaults, &file.repos[1].overrides)
                .unwrap();
        assert_eq!(one.identity.as_ref().unwrap().name, "A");
        assert_eq!(two.identity.as_ref().unwrap().name, "B");
        assert!(one.randomize.is_some());
    }

    #[test]
    fn author_without_email_is_rejected() {
        let defaults = ItemLayer::default();
        let overrides = ItemLayer {
            author: Some("A".into()),
            ..ItemLayer::default()
        };
        let err = work_item_from_layers("url", &defaults, &overrides).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::PartialIdentity)
        ));
    }

    #[test]
    fn duplicate_rename_targets_are_rejected() {
        let mut item = WorkItem::new("url");
        item.renames.insert("a".into(), "x".into());
        item.renames.insert("b".into(), "x".into());
        assert!(matches!(
            item.validate(),
            Err(ValidationError::DuplicateRenameTarget(_))
        ));
    }

    #[test]
    fn noop_renames_do_not_count_as_duplicates() {
        let mut item = WorkItem::new("url");
        item.renames.insert("x".into(), "x".into());
        item.renames.insert("b".into(), "x".into());
        assert!(item.validate().is_ok());
    }

    #[test]
    fn token_without_template_is_rejected() {
        let overrides = ItemLayer {
            token: Some("t".into()),
            ..ItemLayer::default()
        };
        let err = work_item_from_layers("url", &ItemLayer::default(), &overrides).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::MissingNameTemplate)
        ));
    }

    #[test]
    fn bad_scrub_pattern_fails_at_construction() {
        assert!(matches!(
            ScrubSpec::new(&["[unclosed".to_string()], "x"),
            Err(ValidationError::BadPattern { .. })
        ));
    }

    #[test]
    fn inverted_interval_fails_at_lowering() {
        let overrides = ItemLayer {
            randomize_dates: Some(true),
            date_start: Some("2022-01-01".into()),
            date_end: Some("2021-01-01".into()),
            ..ItemLayer::default()
        };
        let err = work_item_from_layers("url", &ItemLayer::default(), &overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Interval(_)));
    }
}
