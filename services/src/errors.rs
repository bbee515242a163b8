use thiserror::Error;

pub type ServicesResult<T> = Result<T, ServicesError>;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
