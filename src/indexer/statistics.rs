// Copyright 2023 Greptime Team
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

use std::time::{Duration, Instant};

use tracing::debug;

pub(crate) type ByteCount = u64;
pub(crate) type RowCount = usize;

/// Stage of the index build process.
enum Stage {
    Update,
    Finish,
    Cleanup,
}

/// Statistics of one column's index build. Flushed to the log when dropped.
pub(crate) struct Statistics {
    /// Index type.
    index_type: &'static str,
    /// Column the index is built for.
    column_name: String,
    /// Accumulated elapsed time for the update stage.
    update_elapsed: Duration,
    /// Accumulated elapsed time for the finish stage.
    finish_elapsed: Duration,
    /// Accumulated elapsed time for the cleanup stage.
    cleanup_elapsed: Duration,
    /// Number of rows fed to the index.
    row_count: RowCount,
    /// Number of bytes in the finished index.
    byte_count: ByteCount,
}

impl Statistics {
    pub fn new(index_type: &'static str, column_name: String) -> Self {
        Self {
            index_type,
            column_name,
            update_elapsed: Duration::default(),
            finish_elapsed: Duration::default(),
            cleanup_elapsed: Duration::default(),
            row_count: 0,
            byte_count: 0,
        }
    }

    /// Starts timing the update stage, returning a `TimerGuard` to automatically record duration.
    #[must_use]
    pub fn record_update(&mut self) -> TimerGuard<'_> {
        TimerGuard::new(self, Stage::Update)
    }

    /// Starts timing the finish stage, returning a `TimerGuard` to automatically record duration.
    #[must_use]
    pub fn record_finish(&mut self) -> TimerGuard<'_> {
        TimerGuard::new(self, Stage::Finish)
    }

    /// Starts timing the cleanup stage, returning a `TimerGuard` to automatically record duration.
    #[must_use]
    pub fn record_cleanup(&mut self) -> TimerGuard<'_> {
        TimerGuard::new(self, Stage::Cleanup)
    }

    /// Returns row count.
    pub fn row_count(&self) -> RowCount {
        self.row_count
    }

    /// Returns byte count.
    pub fn byte_count(&self) -> ByteCount {
        self.byte_count
    }
}

impl Drop for Statistics {
    fn drop(&mut self) {
        debug!(
            index_type = self.index_type,
            column = %self.column_name,
            update_secs = self.update_elapsed.as_secs_f64(),
            finish_secs = self.finish_elapsed.as_secs_f64(),
            cleanup_secs = self.cleanup_elapsed.as_secs_f64(),
            rows = self.row_count,
            bytes = self.byte_count,
            "Index build finished",
        );
    }
}

/// `TimerGuard` is a RAII struct that ensures elapsed time
/// is recorded when it goes out of scope.
pub(crate) struct TimerGuard<'a> {
    stats: &'a mut Statistics,
    stage: Stage,
    timer: Instant,
}

impl<'a> TimerGuard<'a> {
    fn new(stats: &'a mut Statistics, stage: Stage) -> Self {
        Self {
            stats,
            stage,
            timer: Instant::now(),
        }
    }

    /// Increases the row count of the build statistics.
    pub fn inc_row_count(&mut self, n: usize) {
        self.stats.row_count += n;
    }

    /// Increases the byte count of the build statistics.
    pub fn inc_byte_count(&mut self, n: u64) {
        self.stats.byte_count += n;
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        match self.stage {
            Stage::Update => {
                self.stats.update_elapsed += self.timer.elapsed();
            }
            Stage::Finish => {
                self.stats.finish_elapsed += self.timer.elapsed();
            }
            Stage::Cleanup => {
                self.stats.cleanup_elapsed += self.timer.elapsed();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_basic() {
        let mut stats = Statistics::new("bitmap", "host".to_string());
        {
            let mut guard = stats.record_update();
            guard.inc_byte_count(100);
            guard.inc_row_count(10);

            let now = Instant::now();
            while now.elapsed().is_zero() {
                // busy loop
            }
        }
        {
            let _guard = stats.record_finish();
            let now = Instant::now();
            while now.elapsed().is_zero() {
                // busy loop
            }
        }
        {
            let _guard = stats.record_cleanup();
            let now = Instant::now();
            while now.elapsed().is_zero() {
                // busy loop
            }
        }
        assert_eq!(stats.row_count(), 10);
        assert_eq!(stats.byte_count(), 100);
        assert!(stats.update_elapsed > Duration::default());
        assert!(stats.finish_elapsed > Duration::default());
        assert!(stats.cleanup_elapsed > Duration::default());
    }
}
