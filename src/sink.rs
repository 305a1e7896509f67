//! Consumers of accepted readings.

#![allow(async_fn_in_trait)]

use crate::{error::CallbackError, reading::Reading};

/// Receives every reading a [`PollSupervisor`](crate::PollSupervisor) accepts.
///
/// Sinks that need to await (publish over a network, write to a display bus) override
/// [`handle`](CallbackSink::handle). Sinks that run to completion only implement
/// [`handle_sync`](CallbackSink::handle_sync); the default `handle` reports
/// [`CallbackError::NotSuspendable`] and the supervisor calls `handle_sync` instead.
pub trait CallbackSink {
    async fn handle(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        let _ = reading;
        Err(CallbackError::NotSuspendable)
    }

    fn handle_sync(&mut self, reading: &Reading) -> Result<(), CallbackError>;
}

impl<S: CallbackSink> CallbackSink for &mut S {
    async fn handle(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        (**self).handle(reading).await
    }

    fn handle_sync(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        (**self).handle_sync(reading)
    }
}

/// Default sink: logs the reading at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl CallbackSink for LogSink {
    fn handle_sync(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        debug!("{}", reading);
        Ok(())
    }
}

/// Sink backed by a plain closure.
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: FnMut(&Reading) -> Result<(), CallbackError>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> CallbackSink for FnSink<F>
where
    F: FnMut(&Reading) -> Result<(), CallbackError>,
{
    fn handle_sync(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        (self.0)(reading)
    }
}
