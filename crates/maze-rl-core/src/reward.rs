//! Reward signals

use serde::{Deserialize, Serialize};

/// Scalar reward returned by one environment step
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Reward(pub f64);
