//! Two-phase optimistic updates: apply locally, then confirm remotely or
//! roll back.

use std::future::Future;

/// Applies `mutate` to `state` right away, then awaits `remote`.
///
/// If the remote write fails, `state` is restored to its value before
/// `mutate` ran and the error is returned. The caller sees the optimistic
/// value for as long as the remote call is in flight.
///
/// ```
/// # async fn example() {
/// use moviecorn::favorites::optimistic;
///
/// let mut titles = vec!["Inception", "Up"];
/// let result: Result<(), &str> = optimistic::apply(
///     &mut titles,
///     |titles| titles.retain(|t| *t != "Up"),
///     async { Err("offline") },
/// )
/// .await;
///
/// assert!(result.is_err());
/// assert_eq!(titles, ["Inception", "Up"]);
/// # }
/// ```
pub async fn apply<T, R, E, F, Fut>(state: &mut T, mutate: F, remote: Fut) -> Result<R, E>
where
    T: Clone,
    F: FnOnce(&mut T),
    Fut: Future<Output = Result<R, E>>,
{
    let snapshot = state.clone();
    mutate(state);

    match remote.await {
        Ok(confirmed) => Ok(confirmed),
        Err(e) => {
            *state = snapshot;
            Err(e)
        }
    }
}
