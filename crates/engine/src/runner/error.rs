use thiserror::Error;

/// Fatal scan errors. Everything here aborts before or instead of a partial
/// scan; per-plugin failures never surface as an `EngineError`; they are
/// isolated and reported as Unknown findings.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    #[error("Nothing to collect: no plugin matched the current settings")]
    NothingToCollect,

    #[error("Invalid suppression expression '{expression}': {source}")]
    InvalidSuppression {
        expression: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unable to obtain API metadata: {0}")]
    Collection(String),

    #[error("Plugin execution aborted: {0}")]
    Join(String),

    #[error("Output error: {0}")]
    Output(#[from] anyhow::Error),
}
