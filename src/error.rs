use std::io;

use thiserror::Error;

use crate::template::TemplateError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The background timer thread could not be started. There is no way to
    /// recover from this; the session cannot run without its timer.
    #[error("failed to start timer thread: {0}")]
    TimerSpawn(#[source] io::Error),

    #[error("invalid display template: {0}")]
    Template(#[from] TemplateError),

    #[error("tick period must be greater than zero")]
    InvalidPeriod,

    /// Configured periods must be a whole number of seconds.
    #[error("tick period {0}ms is not a whole number of seconds")]
    UnalignedPeriod(u64),

    #[error(transparent)]
    Io(#[from] io::Error),
}
