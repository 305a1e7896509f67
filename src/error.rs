use crate::port::MeasurementKind;

/// Failure of a single hardware transaction. Always transient from the supervisor's
/// point of view: the cycle is dropped and retried after the next interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    #[error("timed out waiting for the sensor")]
    Timeout,
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("no response from the sensor")]
    NoResponse,
    #[error("{0}")]
    Other(&'static str),
}

/// The port answered, but not with something that can become a [`Reading`](crate::Reading).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    #[error("expected a {expected:?} measurement, got {found:?}")]
    WrongKind {
        expected: MeasurementKind,
        found: MeasurementKind,
    },
    #[error("measurement is not a finite number")]
    NotFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleError {
    #[error("sensor read failed: {0}")]
    Read(#[from] SensorError),
    #[error("invalid measurement: {0}")]
    Validation(#[from] ValidationError),
}

/// Raised by a [`CallbackSink`](crate::CallbackSink). Never propagates out of the
/// supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallbackError {
    /// The sink only supports direct invocation; the supervisor retries with
    /// [`CallbackSink::handle_sync`](crate::CallbackSink::handle_sync).
    #[error("sink cannot be awaited")]
    NotSuspendable,
    #[error("sink failed: {0}")]
    Failed(&'static str),
}
