//! Shared types used across Liftoff crates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The only application type the launcher accepts.
pub const APPLICATION_TYPE: &str = "Liftoff";

/// Separator used by every CSV-valued attribute (archives, files, libraries).
pub const LIST_SEPARATOR: &str = ",";

// ── Application identity ───────────────────────────────────────────

/// Identifier assigned by the resource manager to one submitted run.
///
/// Rendered as `application_<cluster timestamp>_<sequence>` with the
/// sequence zero-padded to four digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId {
    pub cluster_timestamp: u64,
    pub id: u32,
}

impl ApplicationId {
    pub fn new(cluster_timestamp: u64, id: u32) -> Self {
        Self { cluster_timestamp, id }
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application_{}_{:04}", self.cluster_timestamp, self.id)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid application id: {0}")]
pub struct ParseApplicationIdError(pub String);

impl FromStr for ApplicationId {
    type Err = ParseApplicationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseApplicationIdError(s.to_string());
        let rest = s.strip_prefix("application_").ok_or_else(invalid)?;
        let (ts, seq) = rest.split_once('_').ok_or_else(invalid)?;
        Ok(ApplicationId {
            cluster_timestamp: ts.parse().map_err(|_| invalid())?,
            id: seq.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = ParseApplicationIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicationId> for String {
    fn from(id: ApplicationId) -> Self {
        id.to_string()
    }
}

// ── Resource manager records ───────────────────────────────────────

/// Container resource request. Only memory is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub memory_mb: u32,
}

/// Response to a new-application request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub application_id: ApplicationId,
    /// Largest container the cluster will grant.
    pub max_capability: Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    New,
    NewSaving,
    Submitted,
    Accepted,
    Running,
    Finished,
    Failed,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Undefined,
    Succeeded,
    Failed,
    Killed,
}

/// Point-in-time status of a submitted application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationReport {
    pub application_id: ApplicationId,
    pub name: String,
    pub queue: String,
    pub user: String,
    pub host: Option<String>,
    pub rpc_port: Option<u16>,
    pub tracking_url: Option<String>,
    pub diagnostics: String,
    /// Start time in milliseconds since the Unix epoch.
    pub start_time: u64,
    pub state: ApplicationState,
    pub final_status: FinalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueAcl {
    SubmitApplications,
    AdministerQueue,
}

/// ACLs the current user holds on one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueUserAcls {
    pub queue_name: String,
    pub user_acls: Vec<QueueAcl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClusterMetrics {
    pub node_managers: u32,
}

// ── Credentials ────────────────────────────────────────────────────

/// A delegation or renewal token issued by a cluster service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: String,
    pub service: String,
    pub renewer: String,
    pub identifier: String,
}

/// Token set shipped to the launched process as an opaque blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub tokens: Vec<Token>,
}

impl Credentials {
    pub fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

// ── Dependency closure ─────────────────────────────────────────────

/// Ordered set of archive locations; insertion order is discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSet {
    entries: Vec<String>,
    seen: HashSet<String>,
}

impl ArchiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a location. Returns false if it was already present.
    pub fn insert(&mut self, location: impl Into<String>) -> bool {
        let location = location.into();
        if self.seen.contains(&location) {
            return false;
        }
        self.seen.insert(location.clone());
        self.entries.push(location);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }
}

impl<S: Into<String>> Extend<S> for ArchiveSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for location in iter {
            self.insert(location);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ArchiveSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ArchiveSet::new();
        set.extend(iter);
        set
    }
}

impl fmt::Display for ArchiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.entries.join(", "))
    }
}

/// Split a CSV attribute into its non-empty, trimmed entries.
pub fn csv_entries(csv: &str) -> impl Iterator<Item = &str> {
    csv.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

// ── Submission descriptor ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    File,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Application,
}

/// A staged artifact the node manager localizes before launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResource {
    pub kind: ResourceKind,
    pub visibility: Visibility,
    /// Shared-store location of the staged copy.
    pub location: String,
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Logical resource name → staged artifact.
pub type ResourceManifest = BTreeMap<String, LocalResource>;

/// Everything the node manager needs to start the master process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchContext {
    pub local_resources: ResourceManifest,
    pub environment: BTreeMap<String, String>,
    /// Command-line tokens, in order.
    pub commands: Vec<String>,
    /// Serialized [`Credentials`], present only in secure mode.
    pub tokens: Option<Vec<u8>>,
}

impl LaunchContext {
    /// The command tokens joined into a single shell line.
    pub fn command_line(&self) -> String {
        self.commands.join(" ")
    }
}

/// Complete package handed to the resource manager. Built once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDescriptor {
    pub application_id: ApplicationId,
    pub name: String,
    pub application_type: String,
    pub queue: Option<String>,
    pub resource: Resource,
    pub priority: u32,
    pub launch_context: LaunchContext,
}
