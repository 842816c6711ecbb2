// Copyright 2024. Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

type OpenedReader = Box<dyn AsyncRead + Send + Unpin>;
type Opener = Box<dyn FnOnce() -> BoxFuture<'static, io::Result<OpenedReader>> + Send>;

enum State {
    Pending(Opener),
    Opening(BoxFuture<'static, io::Result<OpenedReader>>),
    Open(OpenedReader),
    Closed,
}

fn closed_error() -> io::Error {
    io::Error::other("the stream is already closed")
}

/// A byte stream that opens the underlying resource on the first read.
///
/// Connections and file handles are only acquired if somebody actually reads.
/// Dropping or closing the stream releases them.
pub struct LazyStream {
    state: State,
}

impl LazyStream {
    /// Creates a stream that calls `opener` on the first read.
    pub fn new<F, Fut, R>(opener: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = io::Result<R>> + Send + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let opener: Opener = Box::new(move || {
            async move { opener().await.map(|reader| Box::new(reader) as OpenedReader) }.boxed()
        });
        Self {
            state: State::Pending(opener),
        }
    }

    /// Wraps an already opened reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            state: State::Open(Box::new(reader)),
        }
    }

    /// A stream without any content.
    pub fn empty() -> Self {
        Self::from_reader(tokio::io::empty())
    }

    pub fn is_opened(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Opens the stream without reading from it.
    pub async fn open(&mut self) -> io::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, State::Closed) {
                State::Pending(opener) => self.state = State::Opening(opener()),
                State::Opening(opening) => {
                    let reader = opening.await?;
                    self.state = State::Open(reader);
                    return Ok(());
                }
                open @ State::Open(_) => {
                    self.state = open;
                    return Ok(());
                }
                State::Closed => return Err(closed_error()),
            }
        }
    }

    /// Releases the underlying resource, also if it was never opened.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }
}

impl Debug for LazyStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Pending(_) => "Pending",
            State::Opening(_) => "Opening",
            State::Open(_) => "Open",
            State::Closed => "Closed",
        };
        f.debug_struct("LazyStream").field("state", &state).finish()
    }
}

impl AsyncRead for LazyStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                State::Open(reader) => return Pin::new(reader).poll_read(cx, buf),
                State::Opening(opening) => match opening.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(reader)) => this.state = State::Open(reader),
                    Poll::Ready(Err(err)) => {
                        this.state = State::Closed;
                        return Poll::Ready(Err(err));
                    }
                },
                State::Pending(_) => {
                    if let State::Pending(opener) =
                        std::mem::replace(&mut this.state, State::Closed)
                    {
                        this.state = State::Opening(opener());
                    }
                }
                State::Closed => return Poll::Ready(Err(closed_error())),
            }
        }
    }
}
