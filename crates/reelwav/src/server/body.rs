use axum::body::Bytes;
use futures::Stream;
use reelwav_core::Job;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Response body streaming a file out of a job directory.
///
/// Owns the job, so the directory is released once the body has been sent
/// (or the connection dropped), never before.
pub struct JobFileStream {
    inner: ReaderStream<File>,
    _job: Job,
}

impl JobFileStream {
    pub fn new(file: File, job: Job) -> Self {
        Self {
            inner: ReaderStream::new(file),
            _job: job,
        }
    }
}

impl Stream for JobFileStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
