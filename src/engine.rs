//! Diff and alert engine.
//!
//! Turns price observations into history mutations and alert events. The
//! engine never touches the network or the disk: callers load the history,
//! reconcile once, save, and only then deliver the returned alerts.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::models::{AlertEvent, History, HistoryRecord, Identity, PriceObservation};

/// What a reconcile pass did, per identity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Price changes, in observation order.
    pub alerts: Vec<AlertEvent>,
    /// Observations without a price (fetch failed).
    pub unresolved: Vec<Identity>,
    /// Identities recorded for the first time.
    pub first_sightings: Vec<Identity>,
    /// Identities whose price matched the stored one.
    pub unchanged: Vec<Identity>,
    /// Priced observations ignored because the identity was already
    /// reconciled in this pass.
    pub duplicates: Vec<Identity>,
}

/// Reconcile observations against `history`, in input order.
///
/// An identity is mutated at most once per call and only by an observation
/// that carries a price. An alert is emitted only when a stored price exists
/// and differs from the observed one; prices compare by exact decimal
/// value. If any observation lacks an identity nothing is mutated.
pub fn reconcile(
    observations: &[PriceObservation],
    history: &mut History,
) -> Result<Reconciliation, ValidationError> {
    if let Some(index) = observations.iter().position(|o| o.identity.is_empty()) {
        return Err(ValidationError::MissingIdentity { index });
    }

    let mut outcome = Reconciliation::default();
    let mut reconciled: HashSet<&Identity> = HashSet::new();

    for observation in observations {
        let identity = &observation.identity;

        let Some(price) = observation.value else {
            debug!("No price for {}, leaving history untouched", identity);
            outcome.unresolved.push(identity.clone());
            continue;
        };

        if !reconciled.insert(identity) {
            warn!("Ignoring repeated observation of {}", identity);
            outcome.duplicates.push(identity.clone());
            continue;
        }

        match history.get(identity).map(|r| r.last_price) {
            None => {
                info!("First sighting of {} at {}", identity, price);
                history.upsert(HistoryRecord {
                    identity: identity.clone(),
                    last_price: price,
                    last_seen: observation.observed_at,
                });
                outcome.first_sightings.push(identity.clone());
            }
            Some(old_price) if old_price == price => {
                debug!("Price unchanged for {}: {}", identity, price);
                outcome.unchanged.push(identity.clone());
            }
            Some(old_price) => {
                info!("Price of {} moved from {} to {}", identity, old_price, price);
                history.upsert(HistoryRecord {
                    identity: identity.clone(),
                    last_price: price,
                    last_seen: observation.observed_at,
                });
                outcome.alerts.push(AlertEvent {
                    identity: identity.clone(),
                    label: observation.label.clone(),
                    old_price,
                    new_price: price,
                    url: observation.url.clone(),
                });
            }
        }
    }

    Ok(outcome)
}
