use thiserror::Error as ThisError;

use crate::comparator::Operator;
use crate::datum::TypeOid;

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum MedianError {
    #[error("attempt to calculate median on values of different types: expected {expected}, found {found}")]
    TypeMismatch { expected: TypeOid, found: TypeOid },

    #[error("could not find a {operator} operator for type {type_oid}")]
    OperatorNotFound { operator: Operator, type_oid: TypeOid },

    #[error("{operator} is not a predicate operator")]
    NotAPredicate { operator: Operator },

    #[error("could not determine the type of the elements")]
    NoType,

    #[error("kth element selection is out of bounds: k={k}, len={len}")]
    OutOfRange { k: usize, len: usize },

    #[error("ticket {ticket} does not address one of {groups} groups")]
    UnknownGroup { ticket: usize, groups: usize },

    #[error("group lock poisoned by a panicking writer")]
    Poisoned,

    #[error("could not build finalization pool: {0}")]
    Pool(String),
}

pub type Result<T> = std::result::Result<T, MedianError>;
