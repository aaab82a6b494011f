// Copyright 2025 ForkMonkey Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Bounded access to the directory
//!
//! Every remote call goes through a [`RequestGate`]: callers beyond the
//! concurrency limit wait for a permit, and each call is cut off after the
//! per-call timeout.

use crate::error::DirectoryError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;

pub struct RequestGate {
    semaphore: Semaphore,
    max_concurrent: usize,
    timeout: Duration,
}

impl RequestGate {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            timeout,
        }
    }

    /// Run one remote call under a permit and the per-call timeout.
    pub async fn run<T, F>(&self, call: F) -> Result<T, DirectoryError>
    where
        F: Future<Output = Result<T, DirectoryError>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| DirectoryError::Network("request gate closed".to_string()))?;

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }
}
