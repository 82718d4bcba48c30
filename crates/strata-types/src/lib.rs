//! Core types for strata.
//!
//! This crate is the leaf of the workspace. It defines the values that
//! flow between the hook layer and the runtime:
//!
//! - [`Action`]: the `{type, payload}` envelope every dispatch carries
//! - [`ControllerId`]: `(name, namespace)` identity of a controller type
//! - [`SliceKey`]: where a controller's state lives in the global tree
//! - [`StoreId`]: per-store log correlation id
//! - [`ErrorCode`]: the error code contract all crates implement
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ strata-runtime : Store, registry, sagas      │
//! ├──────────────────────────────────────────────┤
//! │ strata-hook    : dispatch hooks              │
//! ├──────────────────────────────────────────────┤
//! │ strata-types   : Action, ids, ErrorCode  ◄── │
//! └──────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod id;

pub use action::{is_reserved_name, Action, RESERVED_PREFIX};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ControllerId, IdError, SliceKey, StoreId};
