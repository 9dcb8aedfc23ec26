//! Replica selection by data freshness.
//!
//! Probing and choosing are separate steps: [`ReplicaProber::probe_all`]
//! collects observations, [`select_max`] folds them. Selection depends only
//! on successful observations.

use crate::error::BackupError;
use crate::member::Replica;
use crate::probe::{ReplicaProber, RevisionObservation};

/// The replica chosen as backup source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub replica: Replica,
    pub revision: i64,
}

/// Highest revision among successful observations.
///
/// Ties go to the observation that comes first. A member reporting
/// revision 0 is a valid answer and can be selected, so an empty but
/// healthy cluster still yields a source. (A search seeded with 0 and a
/// strict comparison would report that cluster as having no reachable
/// member instead.)
pub fn select_max(observations: &[RevisionObservation]) -> Option<(&Replica, i64)> {
    observations
        .iter()
        .filter_map(|o| o.revision().map(|rev| (&o.replica, rev)))
        .fold(None, |best, (replica, rev)| match best {
            Some((_, best_rev)) if rev <= best_rev => best,
            _ => Some((replica, rev)),
        })
}

/// Probe `candidates` and pick the most advanced one.
///
/// `candidates` must already be limited to running members.
pub async fn select_source(
    prober: &ReplicaProber,
    candidates: &[Replica],
) -> Result<Selection, BackupError> {
    if candidates.is_empty() {
        return Err(BackupError::NoRunningReplicas);
    }

    let observations = prober.probe_all(candidates).await;
    let (replica, revision) = select_max(&observations).ok_or(BackupError::NoReachableMember)?;

    tracing::debug!(member = %replica.name, revision, "selected backup source");
    Ok(Selection {
        replica: replica.clone(),
        revision,
    })
}
