use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("plan summary is missing")]
    MissingSummary,
    #[error("plan has no steps")]
    EmptyPlan,
    #[error("step #{index} has no id")]
    MissingStepId { index: usize },
    #[error("step '{step_id}' has no agent id")]
    MissingAgentId { step_id: String },
    #[error("duplicate step id '{step_id}'")]
    DuplicateStep { step_id: String },
    #[error("step '{step_id}' depends on unknown step '{dependency}'")]
    UnknownDependency { step_id: String, dependency: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEndpoint {
    Source,
    Target,
}

impl EdgeEndpoint {
    pub fn label(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphIntegrityError {
    #[error("node #{index} has no id")]
    MissingNodeId { index: usize },
    #[error("duplicate node id '{node_id}'")]
    DuplicateNode { node_id: String },
    #[error("node '{node_id}' has unknown role '{role}'")]
    UnknownRole { node_id: String, role: String },
    #[error("duplicate edge id '{edge_id}'")]
    DuplicateEdge { edge_id: String },
    #[error("edge '{edge_id}' {} references unknown node '{node_id}'", endpoint.label())]
    DanglingEdge {
        edge_id: String,
        endpoint: EdgeEndpoint,
        node_id: String,
    },
}

/// Failure while turning a backend chat response into plan and graph state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("invalid plan: {0}")]
    Plan(#[from] ValidationError),
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphIntegrityError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialize {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("parse {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("cannot determine a data directory; set storage.data_dir")]
    NoDataDir,
}
