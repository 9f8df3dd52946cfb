pub use std::result::Result as StdResult;
pub use std::time::Duration as StdDuration;

pub use anyhow::{anyhow, Context};
pub use tracing::{debug, info, instrument, warn};

pub use crate::error::Error;

/// Boundary result: dataset loading, CLI and output.
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

/// Engine result: the training core only ever fails with [`Error`].
pub type EngineResult<T = ()> = std::result::Result<T, Error>;
