// SPDX-License-Identifier: Apache-2.0

// Data Engine Module
// Store drivers and the types they share

pub mod drivers;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use traits::DataEngine;
pub use types::*;
