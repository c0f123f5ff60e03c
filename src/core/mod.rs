//! Core building blocks: identifiers, credentials, policy sources and the
//! authorization engine

pub mod credential;
pub mod iam;
pub mod storage;
pub mod urn;
