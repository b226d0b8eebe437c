use thiserror::Error;

/// Errors that can occur while running consensus.
#[derive(Error, Debug)]
pub enum Error {
    #[error("actor already started")]
    AlreadyStarted,
    #[error("actor already stopped")]
    AlreadyStopped,
    #[error("unable to create block: {0}")]
    BlockCreation(String),
    #[error("unable to combine signatures: {0}")]
    CombineSignature(&'static str),
    #[error("unable to sign data: {0}")]
    SignData(String),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("unknown view")]
    UnknownView,
    #[error("unknown committee")]
    UnknownCommittee,
    #[error("timeout")]
    Timeout,
    #[error("codec: {0}")]
    Codec(#[from] shardbft_codec::Error),
    #[error("unexpected: {0}")]
    Unexpected(String),
}
