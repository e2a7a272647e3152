use core::{
    fmt::{Debug, Display},
    future::Future,
};
use std::sync::Arc;

use anyhow::{Context as _, Error as AnyhowError, Result};
use futures::future::{self, BoxFuture, FutureExt as _, Shared};
use once_cell::sync::Lazy;
use thiserror::Error;
use types::{
    containers::BlobsBundle,
    nonstandard::{ExecutionPayloadContext, ExecutionPayloadWithValue},
};

use crate::misc::HeaderWithFallbackData;

/// Stands in for the blobs bundle when the builder path is taken.
/// The builder reveals the real bundle together with the full payload.
pub static BLOBS_BUNDLE_BUILDER_PLACEHOLDER: Lazy<Arc<BlobsBundle>> = Lazy::new(Arc::default);

#[must_use]
pub fn is_blobs_bundle_placeholder(blobs_bundle: &Arc<BlobsBundle>) -> bool {
    Arc::ptr_eq(blobs_bundle, &*BLOBS_BUNDLE_BUILDER_PLACEHOLDER)
}

/// Error of a [`SharedFuture`]. Shared futures hand out clones of their output.
#[derive(Clone, Debug, Error)]
#[error("{0:#}")]
pub struct SharedError(Arc<AnyhowError>);

impl From<AnyhowError> for SharedError {
    fn from(error: AnyhowError) -> Self {
        Self(Arc::new(error))
    }
}

impl SharedError {
    /// Looks for `E` at the root of the error, including errors of nested shared futures.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref().or_else(|| {
            self.0
                .downcast_ref::<Self>()
                .and_then(Self::downcast_ref)
        })
    }
}

pub type SharedFuture<T> = Shared<BoxFuture<'static, Result<T, SharedError>>>;

/// Starts `future` on the runtime immediately and returns a handle any number of callers can
/// await. The task runs to completion whether or not the handle is polled.
pub fn spawn_shared<T, F>(future: F) -> SharedFuture<T>
where
    T: Clone + Send + Sync + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(future)
        .map(|result| {
            result
                .context("block production task failed")
                .and_then(|output| output)
                .map_err(SharedError::from)
        })
        .boxed()
        .shared()
}

pub fn ready_shared<T>(output: T) -> SharedFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    future::ready(Ok(output)).boxed().shared()
}

#[derive(Clone)]
pub enum ExecutionPayloadFuture {
    Unblinded(SharedFuture<ExecutionPayloadWithValue>),
    Blinded(SharedFuture<HeaderWithFallbackData>),
}

/// Production results for a single slot.
///
/// Exactly one of the payload and header futures is present. The blobs bundle future is present
/// only for phases with blobs. Results never change after they are cached.
#[derive(Clone)]
pub struct ExecutionPayloadResult {
    context: Arc<ExecutionPayloadContext>,
    payload: ExecutionPayloadFuture,
    blobs_bundle: Option<SharedFuture<Arc<BlobsBundle>>>,
}

impl ExecutionPayloadResult {
    #[must_use]
    pub const fn new(
        context: Arc<ExecutionPayloadContext>,
        payload: ExecutionPayloadFuture,
        blobs_bundle: Option<SharedFuture<Arc<BlobsBundle>>>,
    ) -> Self {
        Self {
            context,
            payload,
            blobs_bundle,
        }
    }

    #[must_use]
    pub fn context(&self) -> &ExecutionPayloadContext {
        &self.context
    }

    #[must_use]
    pub const fn payload(&self) -> &ExecutionPayloadFuture {
        &self.payload
    }

    #[must_use]
    pub const fn is_blinded(&self) -> bool {
        matches!(self.payload, ExecutionPayloadFuture::Blinded(_))
    }

    #[must_use]
    pub const fn execution_payload_future(
        &self,
    ) -> Option<&SharedFuture<ExecutionPayloadWithValue>> {
        match &self.payload {
            ExecutionPayloadFuture::Unblinded(future) => Some(future),
            ExecutionPayloadFuture::Blinded(_) => None,
        }
    }

    #[must_use]
    pub const fn header_future(&self) -> Option<&SharedFuture<HeaderWithFallbackData>> {
        match &self.payload {
            ExecutionPayloadFuture::Unblinded(_) => None,
            ExecutionPayloadFuture::Blinded(future) => Some(future),
        }
    }

    #[must_use]
    pub const fn blobs_bundle_future(&self) -> Option<&SharedFuture<Arc<BlobsBundle>>> {
        self.blobs_bundle.as_ref()
    }
}
