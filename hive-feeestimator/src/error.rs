use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeeEstimatorError {
    #[error("corrupt fee estimate file: {0}")]
    Corrupt(&'static str),
    #[error("fee estimate file requires a newer version ({required}) than this node writes ({supported})")]
    UpVersion { required: i32, supported: i32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] hive_chain::serialization::SerializationError),
}
