// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Sectioned configuration file and the typed settings derived from it.
//!
//! The file is a YAML document whose top-level keys name sections (`GITHUB`,
//! `REPOS`, `ELASTICSEARCH`). Every section is a flat mapping of string keys
//! to scalar values. [`ConfigFile`] exposes raw sections; [`Settings`]
//! validates everything once so that a broken configuration is reported in
//! full before the first request is sent.

use std::{fmt, fs, path::Path, time::Duration};

use serde::Serialize;
use serde_yaml::Value;
use tracing::debug;

use crate::error::{self, Error};

/// Section holding API endpoint, credentials and resource suffixes.
pub const GITHUB_SECTION: &str = "GITHUB";
/// Section mapping repository keys to `owner/repo` paths.
pub const REPOS_SECTION: &str = "REPOS";
/// Section describing the document store.
pub const ELASTICSEARCH_SECTION: &str = "ELASTICSEARCH";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Ordered string mapping read from one configuration section.
///
/// Entries keep the order in which they appear in the file, so repositories
/// are processed in the order the operator listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct Section
{
    entries: Vec<(String, String,),>,
}

impl Section
{
    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str,) -> Option<&str,>
    {
        self.entries.iter().find(|(name, _,)| name == key,).map(|(_, value,)| value.as_str(),)
    }

    /// Iterates over `(key, value)` pairs in file order.
    pub fn iter(&self,) -> impl Iterator<Item = (&str, &str,),>
    {
        self.entries.iter().map(|(key, value,)| (key.as_str(), value.as_str(),),)
    }

    /// Number of entries in the section.
    pub fn len(&self,) -> usize
    {
        self.entries.len()
    }

    /// Returns `true` when the section has no entries.
    pub fn is_empty(&self,) -> bool
    {
        self.entries.is_empty()
    }
}

/// Raw sectioned configuration file.
///
/// # Examples
///
/// ```
/// use repo_pulse::ConfigFile;
///
/// let yaml = r#"
/// REPOS:
///   hello: octocat/Hello-World
/// "#;
/// let config = ConfigFile::parse(yaml,).expect("valid configuration",);
/// let repos = config.get_section("REPOS",).expect("section present",);
/// assert_eq!(repos.get("hello"), Some("octocat/Hello-World"));
/// ```
#[derive(Debug, Clone, Default,)]
pub struct ConfigFile
{
    sections: Vec<(String, Section,),>,
}

impl ConfigFile
{
    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and the errors of
    /// [`ConfigFile::parse`] otherwise.
    pub fn load(path: &Path,) -> Result<Self, Error,>
    {
        debug!("Reading configuration from {}", path.display());
        let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
        Self::parse(&contents,)
    }

    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for invalid YAML and [`Error::Config`] when
    /// the document is not a mapping of sections to flat scalar mappings.
    pub fn parse(contents: &str,) -> Result<Self, Error,>
    {
        let document: Value = serde_yaml::from_str(contents,)?;
        let root = match document {
            Value::Mapping(root,) => root,
            Value::Null => return Ok(Self::default(),),
            _ => return Err(Error::config("configuration root must be a mapping of sections",),),
        };

        let mut sections = Vec::with_capacity(root.len(),);
        for (name, body,) in root {
            let name = scalar_to_string(&name,)
                .ok_or_else(|| Error::config("section names must be scalars",),)?;
            let section = parse_section(&name, body,)?;
            sections.push((name, section,),);
        }

        Ok(Self {
            sections,
        },)
    }

    /// Returns the section called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the section does not exist.
    pub fn get_section(&self, name: &str,) -> Result<&Section, Error,>
    {
        self.sections
            .iter()
            .find(|(candidate, _,)| candidate == name,)
            .map(|(_, section,)| section,)
            .ok_or_else(|| Error::config(format!("missing configuration section '{name}'"),),)
    }
}

fn parse_section(name: &str, body: Value,) -> Result<Section, Error,>
{
    let mapping = match body {
        Value::Mapping(mapping,) => mapping,
        Value::Null => return Ok(Section::default(),),
        _ => return Err(Error::config(format!("section '{name}' must be a mapping"),),),
    };

    let mut entries = Vec::with_capacity(mapping.len(),);
    for (key, value,) in mapping {
        let key = scalar_to_string(&key,)
            .ok_or_else(|| Error::config(format!("section '{name}' has a non-scalar key"),),)?;
        let value = scalar_to_string(&value,).ok_or_else(|| {
            Error::config(format!("{name}.{key} must be a string, number or boolean"),)
        },)?;
        entries.push((key, value,),);
    }

    Ok(Section {
        entries,
    },)
}

fn scalar_to_string(value: &Value,) -> Option<String,>
{
    match value {
        Value::String(text,) => Some(text.clone(),),
        Value::Number(number,) => Some(number.to_string(),),
        Value::Bool(flag,) => Some(flag.to_string(),),
        _ => None,
    }
}

/// Repository selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize,)]
pub struct RepoRef
{
    /// Identifier used in logs, reports and stored documents.
    pub key:  String,
    /// API path fragment in `owner/repo` form.
    pub path: String,
}

impl RepoRef
{
    /// Creates a repository reference.
    pub fn new(key: impl Into<String,>, path: impl Into<String,>,) -> Self
    {
        Self {
            key: key.into(), path: path.into(),
        }
    }
}

impl fmt::Display for RepoRef
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{} ({})", self.key, self.path)
    }
}

/// Stats API connection settings.
#[derive(Clone, Serialize,)]
pub struct GithubSettings
{
    /// Base endpoint the repository path is appended to.
    pub endpoint:        String,
    /// Verbatim `Authorization` header value.
    #[serde(skip_serializing)]
    pub api_key:         String,
    /// Suffix selecting the punch-card resource.
    pub punch_card_rsrc: String,
    /// Suffix selecting the contributors resource.
    pub contrib_rsrc:    String,
    /// Per-request timeout.
    #[serde(with = "duration_secs")]
    pub timeout:         Duration,
}

impl fmt::Debug for GithubSettings
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.debug_struct("GithubSettings",)
            .field("endpoint", &self.endpoint,)
            .field("api_key", &"<redacted>",)
            .field("punch_card_rsrc", &self.punch_card_rsrc,)
            .field("contrib_rsrc", &self.contrib_rsrc,)
            .field("timeout", &self.timeout,)
            .finish()
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize,)]
pub struct ElasticSettings
{
    /// Host name, optionally with a scheme.
    pub host:          String,
    /// TCP port.
    pub port:          u16,
    /// Index receiving punch-card samples.
    pub main_index:    String,
    /// Index receiving contribution records.
    pub contrib_index: String,
}

impl ElasticSettings
{
    /// Base URL of the store, defaulting to plain HTTP.
    pub fn base_url(&self,) -> String
    {
        let host = self.host.trim_end_matches('/',);
        if host.starts_with("http://",) || host.starts_with("https://",) {
            format!("{host}:{}", self.port)
        } else {
            format!("http://{host}:{}", self.port)
        }
    }
}

/// Fully validated settings for one run.
#[derive(Debug, Clone, Serialize,)]
pub struct Settings
{
    /// Stats API settings.
    pub github:        GithubSettings,
    /// Repositories in configuration order.
    pub repos:         Vec<RepoRef,>,
    /// Document store settings.
    pub elasticsearch: ElasticSettings,
}

impl Settings
{
    /// Loads and validates settings from the file at `path`.
    ///
    /// # Errors
    ///
    /// Propagates loading errors and the validation errors of
    /// [`Settings::from_config`].
    pub fn load(path: &Path,) -> Result<Self, Error,>
    {
        let config = ConfigFile::load(path,)?;
        Self::from_config(&config,)
    }

    /// Validates every required section and key at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing all missing sections and keys, or
    /// describing the first value that cannot be interpreted.
    pub fn from_config(config: &ConfigFile,) -> Result<Self, Error,>
    {
        let mut missing = Vec::new();

        let github = lookup_section(config, GITHUB_SECTION, &mut missing,);
        let repos = lookup_section(config, REPOS_SECTION, &mut missing,);
        let elastic = lookup_section(config, ELASTICSEARCH_SECTION, &mut missing,);

        let endpoint = require(github, GITHUB_SECTION, &["endpoint"], &mut missing,);
        let api_key = require(github, GITHUB_SECTION, &["api_key"], &mut missing,);
        let punch_card_rsrc = require(github, GITHUB_SECTION, &["punch_card_rsrc"], &mut missing,);
        let contrib_rsrc = require(github, GITHUB_SECTION, &["contrib_rsrc"], &mut missing,);

        let host = require(elastic, ELASTICSEARCH_SECTION, &["host"], &mut missing,);
        let port = require(elastic, ELASTICSEARCH_SECTION, &["port"], &mut missing,);
        let main_index = require(elastic, ELASTICSEARCH_SECTION, &["main_index", "index"], &mut missing,);
        let contrib_index = require(elastic, ELASTICSEARCH_SECTION, &["contrib_index"], &mut missing,);

        if let Some(repos,) = repos
            && repos.is_empty()
        {
            missing.push(format!("{REPOS_SECTION}.<key>"),);
        }

        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required configuration keys: {}",
                missing.join(", ")
            ),),);
        }

        let timeout_secs = match github.and_then(|section| section.get("timeout_secs",),) {
            Some(raw,) => raw.trim().parse::<u64,>().map_err(|e| {
                Error::config(format!("{GITHUB_SECTION}.timeout_secs must be an integer: {e}"),)
            },)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(Error::config(format!("{GITHUB_SECTION}.timeout_secs must be positive"),),);
        }

        let port = port.unwrap_or_default().trim().parse::<u16,>().map_err(|e| {
            Error::config(format!("{ELASTICSEARCH_SECTION}.port must be a TCP port: {e}"),)
        },)?;

        let repos = repos
            .map(|section| {
                section.iter().map(|(key, path,)| RepoRef::new(key, path.trim(),),).collect()
            },)
            .unwrap_or_default();

        Ok(Self {
            github: GithubSettings {
                endpoint: endpoint.unwrap_or_default(),
                api_key: api_key.unwrap_or_default(),
                punch_card_rsrc: punch_card_rsrc.unwrap_or_default(),
                contrib_rsrc: contrib_rsrc.unwrap_or_default(),
                timeout: Duration::from_secs(timeout_secs,),
            },
            repos,
            elasticsearch: ElasticSettings {
                host: host.unwrap_or_default(),
                port,
                main_index: main_index.unwrap_or_default(),
                contrib_index: contrib_index.unwrap_or_default(),
            },
        },)
    }
}

fn lookup_section<'a,>(
    config: &'a ConfigFile,
    name: &str,
    missing: &mut Vec<String,>,
) -> Option<&'a Section,>
{
    match config.get_section(name,) {
        Ok(section,) => Some(section,),
        Err(_,) => {
            missing.push(name.to_owned(),);
            None
        }
    }
}

/// Looks up the first present, non-blank key among `keys`.
///
/// Keys of an absent section are not reported individually; the section
/// itself is already listed.
fn require(
    section: Option<&Section,>,
    section_name: &str,
    keys: &[&str],
    missing: &mut Vec<String,>,
) -> Option<String,>
{
    let section = section?;
    let found = keys
        .iter()
        .filter_map(|key| section.get(key,),)
        .map(str::trim,)
        .find(|value| !value.is_empty(),)
        .map(str::to_owned,);
    if found.is_none() {
        missing.push(format!("{section_name}.{}", keys[0]),);
    }
    found
}

mod duration_secs
{
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S,>(value: &Duration, serializer: S,) -> Result<S::Ok, S::Error,>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs(),)
    }
}
