use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown device family: {0}")]
    UnknownFamily(String),

    #[error("Invalid bus descriptor: {0}")]
    InvalidDescriptor(String),
}

pub type Result<T> = std::result::Result<T, Error>;
