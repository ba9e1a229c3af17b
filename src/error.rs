use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// 脚本求值失败
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("script failed: {0}")]
    Script(String),
    #[error("script task aborted: {0}")]
    Aborted(String),
    #[error("parameter name `{0}` is reserved by the evaluator")]
    ReservedName(String),
    #[error("parameter name `{0}` is not a valid identifier")]
    InvalidName(String),
    #[error("cannot read resource {path}: {source}")]
    ResourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("channel to node `{0}` is disconnected")]
    Disconnected(String),
    #[error("remote execution threw: {0}")]
    RemoteFailure(String),
    #[error("unexpected reply from node `{node}`: {reply}")]
    UnexpectedReply { node: String, reply: String },
    #[error("cannot encode agent message: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("redis transport failed: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource path `{path}` escapes base directory {base}")]
    OutsideBase { path: String, base: PathBuf },
    #[error("resource path must not be empty")]
    EmptyPath,
}

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("resource {0} does not exist on the controller")]
    MissingResource(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transfer to remote node failed: {0}")]
    Transport(#[from] TransportError),
}

/// Failures of the remote execution path. Always logged and turned into a null value.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("staging failed: {0}")]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("remote call did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("invalid parameter identity `{0}`")]
    InvalidUuid(String),
    #[error("parameter `{name}` expects exactly one value, got {count}")]
    WrongValueCount { name: String, count: usize },
    #[error("value `{value}` is not a valid choice for parameter `{name}`")]
    InvalidChoice { name: String, value: String },
    #[error("no script with catalog id `{0}` exists")]
    UnknownScript(String),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
