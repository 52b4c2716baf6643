// SPDX-License-Identifier: Apache-2.0
//! CLI command implementations.

pub mod cancel;
pub mod common;
pub mod resource;
pub mod result;
pub mod run;
pub mod status;
