#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod chat;
pub mod error;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Query parameter carrying the channel authentication token.
///
/// The embedder passes the token in its launch parameters; connect attempts
/// refuse to dial without it and append it to the endpoint under this name.
pub const TOKEN_PARAM: &str = "token";
