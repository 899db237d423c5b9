use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid pipeline document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("The fixed system prompt node cannot be removed")]
    FixedNodeRemoval,
}
