use crate::application::actions::{fetch_class, FetchStarted};
use crate::domain::error::IqmsError;
use crate::domain::model::{status_key, QueryClass};
use crate::domain::role::{ActiveRole, Level};
use crate::state::AppState;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{info, warn};

/// Progress of a role switch, for a "switching role" indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchProgress {
    Started { total: usize },
    Task {
        current: usize,
        total: usize,
        name: String,
        ok: bool,
    },
    Finished,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub name: String,
    pub error: IqmsError,
}

/// Outcome of a role switch. Sub-fetch failures are reported, not raised.
#[derive(Debug, Default)]
pub struct SwitchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub failures: Vec<TaskFailure>,
    /// Fetches whose first page landed; later pages may still be loading
    pub started: Vec<FetchStarted>,
}

impl SwitchSummary {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Wait for every background page loop to end
    pub async fn wait_all(&mut self) {
        for started in self.started.drain(..) {
            if let Err(e) = started.finished().await {
                warn!("background fetch ended abnormally: {}", e);
            }
        }
    }
}

/// Switch to `next`, refetching every class at every level
pub async fn switch_role<F>(
    state: &AppState,
    previous: Option<&ActiveRole>,
    next: &ActiveRole,
    progress: F,
) -> Result<SwitchSummary, IqmsError>
where
    F: FnMut(&SwitchProgress),
{
    switch_role_scoped(state, previous, next, &QueryClass::ALL, &Level::ALL, progress).await
}

/// Role switch limited to some classes and levels
///
/// Stale keys of the previous role are dropped from the stores and the board
/// first. The new role is validated before anything is discarded.
pub async fn switch_role_scoped<F>(
    state: &AppState,
    previous: Option<&ActiveRole>,
    next: &ActiveRole,
    classes: &[QueryClass],
    levels: &[Level],
    mut progress: F,
) -> Result<SwitchSummary, IqmsError>
where
    F: FnMut(&SwitchProgress),
{
    for level in levels {
        next.filter(*level)?;
    }

    if let Some(previous) = previous {
        if let Err(e) = discard_role(state, previous).await {
            warn!("could not discard cache of previous role {}: {}", previous, e);
        }
    }

    let total = classes.len() * levels.len();
    progress(&SwitchProgress::Started { total });
    info!("switching role to {} ({} fetches)", next, total);

    let mut pending = FuturesUnordered::new();
    for class in classes {
        for level in levels {
            let (class, level) = (*class, *level);
            pending.push(async move {
                let name = format!("{} {}", class, level);
                (name, fetch_class(state, class, next, level).await)
            });
        }
    }

    let mut summary = SwitchSummary {
        total,
        ..Default::default()
    };
    let mut current = 0;
    while let Some((name, result)) = pending.next().await {
        current += 1;
        let ok = result.is_ok();
        match result {
            Ok(started) => {
                summary.successful += 1;
                summary.started.push(started);
            }
            Err(error) => {
                warn!("role switch task {} failed: {}", name, error);
                summary.failed += 1;
                summary.failures.push(TaskFailure {
                    name: name.clone(),
                    error,
                });
            }
        }
        progress(&SwitchProgress::Task {
            current,
            total,
            name,
            ok,
        });
    }

    progress(&SwitchProgress::Finished);
    info!(
        "role switch done: {}/{} succeeded",
        summary.successful, summary.total
    );
    Ok(summary)
}

/// Remove every key of a role, all classes and levels, from stores and board
pub async fn discard_role(state: &AppState, role: &ActiveRole) -> Result<(), IqmsError> {
    let keys = role.all_keys()?;
    for class in QueryClass::ALL {
        let store = state.store_for(class).await;
        for key in &keys {
            store.remove(class.namespace(), key).await?;
            state.board.remove(&status_key(class, key));
        }
    }
    Ok(())
}
