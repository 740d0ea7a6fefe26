use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] likewatch_store::StoreError),

    #[error("directory error: {0}")]
    Directory(#[from] likewatch_directory::DirectoryError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
