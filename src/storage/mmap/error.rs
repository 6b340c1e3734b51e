use thiserror::Error;

#[derive(Error, Debug)]
pub enum MmapError {
    #[error("cannot map slot file: {0}")]
    Io(#[from] std::io::Error),

    #[error("slot file is empty")]
    EmptyFile,

    #[error("slot archive failed validation: {0}")]
    ValidationFailed(String),

    #[error("mapped slot is not aligned to {alignment} bytes")]
    AlignmentError { alignment: usize },
}

pub type MmapResult<T> = Result<T, MmapError>;
