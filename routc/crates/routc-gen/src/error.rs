//! Code generation errors.
//!
//! None of these occur on a tree the analyzer accepted with a fully
//! declared type picture; they cover the residue the analyzer does not
//! type-check (field names, aggregate shapes).

use routc_util::Span;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenError {
    #[error("no field '{field}' in record at {span}")]
    UnknownField { field: String, span: Span },

    #[error("field access on a non-record value at {span}")]
    NotARecord { span: Span },

    #[error("subscript on a non-array value at {span}")]
    NotAnArray { span: Span },

    #[error("cannot determine the record layout for this literal at {span}")]
    UnknownRecordLayout { span: Span },

    #[error("variable '{name}' has no storage at {span}")]
    UnknownVariable { name: String, span: Span },

    #[error("routine '{name}' has no signature at {span}")]
    UnknownRoutine { name: String, span: Span },
}

pub type GenResult<T> = Result<T, GenError>;
