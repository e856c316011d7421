use meter_client::db::StoreError;

use crate::validation::ValidationError;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("house not found: {0}")]
    HouseNotFound(String),
    #[error("reading not found: {0}")]
    ReadingNotFound(String),
    #[error("join request not found: {0}")]
    RequestNotFound(String),
    #[error("No house found with that join code. Please double-check and try again.")]
    UnknownJoinCode,
    #[error("not a member of this house")]
    NotMember,
    #[error("only the house owner can do that")]
    NotOwner,
    #[error("billing cycle start readings cannot be edited or deleted")]
    ProtectedReading,
    #[error("the house owner cannot be removed")]
    CannotRemoveOwner,
    #[error("already a member of a house")]
    AlreadyInHouse,
    #[error("a join request for this house is already pending")]
    DuplicateRequest,
    #[error("narrative assessment is not configured")]
    NarrativeUnavailable,
    #[error(transparent)]
    Store(#[from] StoreError),
}
