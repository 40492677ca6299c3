use thiserror::Error;

/// Failures that abort a conversion or upload run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("empty input: the csv has no columns")]
    NoColumns,

    #[error("missing api token: pass --token or set TANA_API_TOKEN")]
    MissingToken,

    #[error("{what} creation rejected with status {status}: {body}")]
    SchemaRejected {
        what: &'static str,
        status: u16,
        body: String,
    },

    #[error("{what} creation returned {got} id(s), expected {expected}")]
    SchemaIncomplete {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("batch {batch} of ~{planned} rejected with status {status} after {nodes_sent} node(s) were sent: {body}")]
    BatchRejected {
        batch: usize,
        planned: usize,
        nodes_sent: usize,
        status: u16,
        body: String,
    },
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::NoColumns => "missing_input",
            SyncError::MissingToken => "missing_token",
            SyncError::SchemaRejected { .. } => "schema_rejected",
            SyncError::SchemaIncomplete { .. } => "schema_incomplete",
            SyncError::BatchRejected { .. } => "batch_rejected",
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SyncError::MissingToken => Some("create an API token in Tana and set TANA_API_TOKEN in env or .env"),
            SyncError::BatchRejected { .. } => Some("batches already sent stay in the Tana inbox"),
            SyncError::SchemaIncomplete { .. } | SyncError::SchemaRejected { .. } => {
                Some("no nodes were uploaded; fields created so far stay in the workspace schema")
            }
            SyncError::NoColumns => None,
        }
    }
}
