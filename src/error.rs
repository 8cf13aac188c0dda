use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("failed to read {}: {source}", path.display())]
    DataRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    DataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("baseline lookup request failed: {0}")]
    LookupTransport(#[from] reqwest::Error),

    #[error("baseline lookup returned {status}: {body}")]
    LookupStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unknown household {id}")]
    UnknownHousehold { id: u64 },

    #[error("unknown member {member} in household {household}")]
    UnknownMember { household: u64, member: u64 },
}

pub type SimResult<T> = Result<T, SimError>;
