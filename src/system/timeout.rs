/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2025 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Timeouts for async operations, used to bound JSON-RPC round-trips
//! and transaction confirmation waits.
use std::{
    error::Error,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use pin_project_lite::pin_project;
use smol::Timer;

/// Run a future to completion, or give up once `dur` has elapsed.
///
/// ```
/// # smol::block_on(async {
/// use std::time::Duration;
/// use devsdao::system::timeout;
///
/// let never = smol::future::pending::<()>();
/// assert!(timeout(Duration::from_millis(5), never).await.is_err());
/// # })
/// ```
pub async fn timeout<F, T>(dur: Duration, f: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    TimeoutFuture { future: f, delay: Timer::after(dur), started: Instant::now() }.await
}

pin_project! {
    /// A future racing its inner future against a timer.
    pub struct TimeoutFuture<F> {
        #[pin]
        future: F,
        #[pin]
        delay: Timer,
        started: Instant,
    }
}

impl<F: Future> Future for TimeoutFuture<F> {
    type Output = Result<F::Output, TimeoutError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if let Poll::Ready(v) = this.future.poll(cx) {
            return Poll::Ready(Ok(v))
        }

        match this.delay.poll(cx) {
            Poll::Ready(_) => Poll::Ready(Err(TimeoutError { elapsed: this.started.elapsed() })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// An error returned when a future times out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimeoutError {
    /// How long we waited before giving up
    pub elapsed: Duration,
}

impl Error for TimeoutError {}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation timed out after {:?}", self.elapsed)
    }
}
