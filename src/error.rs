// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use std::fmt;
use thiserror::Error;

/// Broad categories of [`Error`], for callers that only care about the kind
/// of failure and not its details.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    Domain,
    Representation,
    Overflow,
    ContextConfig,
    StochasticBits,
    TypeMismatch,
    Parse,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum Error {
    /// an operation was given an argument outside of where it is defined,
    /// like splitting an infinity or converting NaN to an integer
    #[error("{what}: {value}")]
    Domain { what: &'static str, value: String },
    /// a value cannot be represented exactly where exactness was demanded
    #[error("{what}: {value}{}", context_suffix(.context))]
    Representation {
        what: &'static str,
        value: String,
        context: Option<String>,
    },
    #[error("overflow: {value} is out of range for {context}")]
    Overflow { value: String, context: String },
    #[error("invalid context parameters: {0}")]
    ContextConfig(String),
    /// every registered engine declined to evaluate an operator
    #[error("cannot evaluate {op}({args}) under {context}")]
    CannotEvaluate {
        op: &'static str,
        args: String,
        context: String,
    },
    #[error("random bits {randbits:#x} do not fit in {num_randbits} bits")]
    StochasticBits { randbits: u64, num_randbits: u32 },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("parse error: {0}")]
    Parse(String),
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" under {}", context),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Domain { .. } | Error::CannotEvaluate { .. } => ErrorKind::Domain,
            Error::Representation { .. } => ErrorKind::Representation,
            Error::Overflow { .. } => ErrorKind::Overflow,
            Error::ContextConfig(_) => ErrorKind::ContextConfig,
            Error::StochasticBits { .. } => ErrorKind::StochasticBits,
            Error::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Error::Parse(_) => ErrorKind::Parse,
        }
    }
    pub(crate) fn domain(what: &'static str, value: impl fmt::Display) -> Self {
        Error::Domain {
            what,
            value: value.to_string(),
        }
    }
    pub(crate) fn representation(what: &'static str, value: impl fmt::Display) -> Self {
        Error::Representation {
            what,
            value: value.to_string(),
            context: None,
        }
    }
    pub(crate) fn not_representable(value: impl fmt::Display, context: impl fmt::Display) -> Self {
        Error::Representation {
            what: "not representable",
            value: value.to_string(),
            context: Some(context.to_string()),
        }
    }
    pub(crate) fn overflow(value: impl fmt::Display, context: impl fmt::Display) -> Self {
        Error::Overflow {
            value: value.to_string(),
            context: context.to_string(),
        }
    }
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::ContextConfig(message.into())
    }
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }
}
