//! Bounded pool for blocking handler and component code

use larkspur_exception::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default number of concurrently running blocking tasks
pub const DEFAULT_WORKER_THREADS: usize = 16;

/// Semaphore-bounded wrapper over [`tokio::task::spawn_blocking`].
///
/// The permit travels into the blocking closure and is released when the closure
/// returns, even if the awaiting caller was cancelled in the meantime.
#[derive(Debug, Clone)]
pub struct WorkerPool {
	permits: Arc<Semaphore>,
	size: usize,
}

impl WorkerPool {
	pub fn new(size: usize) -> Self {
		let size = size.max(1);
		Self {
			permits: Arc::new(Semaphore::new(size)),
			size,
		}
	}

	pub fn size(&self) -> usize {
		self.size
	}

	/// Permits currently free
	pub fn available(&self) -> usize {
		self.permits.available_permits()
	}

	/// Run `f` on a blocking thread once a permit is free.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_di::WorkerPool;
	///
	/// # tokio_test::block_on(async {
	/// let pool = WorkerPool::new(2);
	/// let sum = pool.run(|| Ok(1 + 2)).await.unwrap();
	/// assert_eq!(sum, 3);
	/// assert_eq!(pool.available(), 2);
	/// # });
	/// ```
	pub async fn run<F, T>(&self, f: F) -> Result<T>
	where
		F: FnOnce() -> Result<T> + Send + 'static,
		T: Send + 'static,
	{
		let permit = self
			.permits
			.clone()
			.acquire_owned()
			.await
			.map_err(|e| Error::Internal(format!("Worker pool closed: {}", e)))?;
		tokio::task::spawn_blocking(move || {
			let _permit = permit;
			f()
		})
		.await
		.map_err(|e| {
			if e.is_panic() {
				tracing::error!("Blocking task panicked");
				Error::Internal("Blocking task panicked".to_string())
			} else {
				Error::Internal(format!("Blocking task failed: {}", e))
			}
		})?
	}
}

impl Default for WorkerPool {
	fn default() -> Self {
		Self::new(DEFAULT_WORKER_THREADS)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	#[rstest]
	#[tokio::test]
	async fn test_run_bounds_concurrency() {
		// Arrange
		let pool = WorkerPool::new(2);
		let running = Arc::new(AtomicUsize::new(0));
		let peak = Arc::new(AtomicUsize::new(0));

		// Act
		let tasks: Vec<_> = (0..6)
			.map(|_| {
				let pool = pool.clone();
				let running = running.clone();
				let peak = peak.clone();
				tokio::spawn(async move {
					pool.run(move || {
						let now = running.fetch_add(1, Ordering::SeqCst) + 1;
						peak.fetch_max(now, Ordering::SeqCst);
						std::thread::sleep(Duration::from_millis(20));
						running.fetch_sub(1, Ordering::SeqCst);
						Ok(())
					})
					.await
				})
			})
			.collect();
		for task in tasks {
			task.await.unwrap().unwrap();
		}

		// Assert
		assert!(peak.load(Ordering::SeqCst) <= 2);
		assert_eq!(pool.available(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_panic_becomes_internal_error() {
		let pool = WorkerPool::new(1);

		let result: Result<()> = pool.run(|| panic!("boom")).await;

		assert!(matches!(result, Err(Error::Internal(_))));
		assert_eq!(pool.available(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_cancelled_caller_releases_permit() {
		// Arrange
		let pool = WorkerPool::new(1);
		let call = pool.run(|| {
			std::thread::sleep(Duration::from_millis(30));
			Ok(())
		});

		// Act
		let _ = tokio::time::timeout(Duration::from_millis(1), call).await;
		tokio::time::sleep(Duration::from_millis(80)).await;

		// Assert
		assert_eq!(pool.available(), 1);
	}

	#[rstest]
	fn test_zero_size_is_clamped() {
		assert_eq!(WorkerPool::new(0).size(), 1);
	}
}
