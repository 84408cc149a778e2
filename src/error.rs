use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported action kind '{kind}' at {location} (expected step, group or shared)")]
    UnsupportedActionKind { kind: String, location: String },

    #[error("Shared step {0} not found")]
    SharedStepNotFound(u64),

    #[error("Shared step cycle detected: {0}")]
    SharedStepCycle(String),

    #[error("Test plan not found: {0}")]
    PlanNotFound(String),

    #[error("Export error: {0}")]
    Export(String),
}
