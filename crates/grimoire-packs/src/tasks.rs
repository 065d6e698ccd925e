//! Per-pack parallelism.

use grimoire_core::{Error, Result};
use tokio::task::JoinSet;

/// Run blocking jobs on the blocking pool and collect their outputs in
/// submission order.
///
/// The first failure is returned as soon as it is seen; dropping the
/// `JoinSet` aborts the jobs that have not started yet.
pub async fn run_blocking<T, F>(jobs: Vec<F>) -> Result<Vec<T>>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let count = jobs.len();
    let mut set = JoinSet::new();
    for (i, job) in jobs.into_iter().enumerate() {
        set.spawn_blocking(move || job().map(|out| (i, out)));
    }

    let mut results = Vec::with_capacity(count);
    while let Some(joined) = set.join_next().await {
        let (i, out) = joined.map_err(|e| Error::task(format!("pack task failed: {e}")))??;
        results.push((i, out));
    }
    results.sort_by_key(|(i, _)| *i);
    Ok(results.into_iter().map(|(_, out)| out).collect())
}
