//! DON diff engine.
//!
//! Given the capability being launched and two registry snapshots, compute
//! which CCIP DONs appeared, disappeared, or persisted between them.

use std::collections::BTreeMap;

use alloy_primitives::keccak256;
use ccip_id::{CapabilityId, DonId};

use crate::registry::{DonInfo, RegistryState};
use crate::ReconcileError;

/// Compute the on-chain identity of a capability.
///
/// The id is `keccak256(utf8(version) ++ utf8(labelled_name))`.
pub fn capability_id(labelled_name: &str, version: &str) -> CapabilityId {
    let mut preimage = Vec::with_capacity(version.len() + labelled_name.len());
    preimage.extend_from_slice(version.as_bytes());
    preimage.extend_from_slice(labelled_name.as_bytes());
    CapabilityId::from_bytes(keccak256(&preimage).0)
}

/// Partition of CCIP DON ids between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    /// DONs present only in the new snapshot.
    pub added: BTreeMap<DonId, DonInfo>,

    /// DONs present only in the old snapshot.
    pub removed: BTreeMap<DonId, DonInfo>,

    /// DONs present in both, taken from the new snapshot.
    ///
    /// Membership here is unconditional; contents are not compared.
    pub updated: BTreeMap<DonId, DonInfo>,
}

impl RegistryDiff {
    /// Returns true if any DON was added or removed.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Total number of CCIP DONs classified.
    pub fn don_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }
}

/// Select the DONs hosting the capability, keyed by id.
///
/// A DON hosting the capability must host nothing else.
pub fn filter_ccip_dons(
    state: &RegistryState,
    capability: &CapabilityId,
) -> Result<BTreeMap<DonId, DonInfo>, ReconcileError> {
    let mut dons = BTreeMap::new();

    for don in state.dons.iter().filter(|d| d.hosts(capability)) {
        if don.capability_configurations.len() != 1 {
            return Err(ReconcileError::InvalidDonShape {
                don_id: don.id,
                configurations: don.capability_configurations.len(),
            });
        }
        dons.insert(don.id, don.clone());
    }

    Ok(dons)
}

/// Diff two snapshots for one capability.
///
/// The capability must be registered in `new`. Both snapshots are filtered
/// before anything is classified, so a malformed DON in either aborts the diff.
pub fn diff(
    labelled_name: &str,
    version: &str,
    old: &RegistryState,
    new: &RegistryState,
) -> Result<RegistryDiff, ReconcileError> {
    let descriptor = new.find_capability(labelled_name, version).ok_or_else(|| {
        ReconcileError::CapabilityNotFound {
            labelled_name: labelled_name.to_string(),
            version: version.to_string(),
        }
    })?;
    let capability = descriptor.id();

    let old_dons = filter_ccip_dons(old, &capability)?;
    let mut new_dons = filter_ccip_dons(new, &capability)?;

    let mut result = RegistryDiff::default();

    for (id, don) in old_dons {
        match new_dons.remove(&id) {
            Some(current) => {
                result.updated.insert(id, current);
            }
            None => {
                result.removed.insert(id, don);
            }
        }
    }
    result.added = new_dons;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use alloy_primitives::Bytes;
    use ccip_id::PeerId;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::registry::{CapabilityConfiguration, CapabilityDescriptor};

    const NAME: &str = "ccip";
    const VERSION: &str = "1.0.0";

    fn ccip_id() -> CapabilityId {
        capability_id(NAME, VERSION)
    }

    fn other_id() -> CapabilityId {
        capability_id("write_ethereum", "1.0.0")
    }

    fn don(id: u32, capabilities: &[CapabilityId]) -> DonInfo {
        DonInfo {
            id: DonId::new(id),
            node_p2p_ids: BTreeSet::from([PeerId::from_bytes([1u8; 32])]),
            capability_configurations: capabilities
                .iter()
                .map(|c| CapabilityConfiguration {
                    capability_id: *c,
                    config: Bytes::new(),
                })
                .collect(),
            f: 1,
            config_count: 1,
            is_public: false,
            accepts_workflows: false,
        }
    }

    fn state(dons: Vec<DonInfo>) -> RegistryState {
        RegistryState {
            dons,
            capabilities: vec![CapabilityDescriptor::new(NAME, VERSION)],
            nodes: vec![],
        }
    }

    #[test]
    fn test_capability_id_is_keccak_of_version_then_name() {
        let expected = keccak256(b"1.0.0ccip");
        assert_eq!(capability_id(NAME, VERSION).as_bytes(), &expected.0);
        assert_ne!(capability_id(NAME, VERSION), capability_id(VERSION, NAME));
    }

    #[test]
    fn test_added_don() {
        let old = state(vec![]);
        let new = state(vec![don(7, &[ccip_id()])]);

        let d = diff(NAME, VERSION, &old, &new).unwrap();
        assert_eq!(d.added.keys().copied().collect::<Vec<_>>(), vec![DonId::new(7)]);
        assert!(d.removed.is_empty());
        assert!(d.updated.is_empty());
    }

    #[test]
    fn test_removed_don() {
        let old = state(vec![don(7, &[ccip_id()])]);
        let new = state(vec![don(7, &[])]);

        let d = diff(NAME, VERSION, &old, &new).unwrap();
        assert!(d.added.is_empty());
        assert!(d.removed.contains_key(&DonId::new(7)));
        assert!(d.updated.is_empty());
    }

    #[test]
    fn test_updated_is_unconditional() {
        let old = state(vec![don(7, &[ccip_id()])]);
        let new = old.clone();

        let d = diff(NAME, VERSION, &old, &new).unwrap();
        assert!(!d.has_changes());
        assert!(d.updated.contains_key(&DonId::new(7)));
    }

    #[test]
    fn test_updated_carries_new_contents() {
        let old = state(vec![don(7, &[ccip_id()])]);
        let mut changed = don(7, &[ccip_id()]);
        changed.f = 2;
        let new = state(vec![changed]);

        let d = diff(NAME, VERSION, &old, &new).unwrap();
        assert_eq!(d.updated[&DonId::new(7)].f, 2);
    }

    #[test]
    fn test_non_ccip_dons_ignored() {
        let old = state(vec![don(1, &[other_id()])]);
        let new = state(vec![don(1, &[other_id()]), don(2, &[other_id()])]);

        let d = diff(NAME, VERSION, &old, &new).unwrap();
        assert_eq!(d.don_count(), 0);
    }

    #[test]
    fn test_capability_not_found() {
        let old = state(vec![]);
        let mut new = state(vec![don(7, &[ccip_id()])]);
        new.capabilities.clear();

        let err = diff(NAME, VERSION, &old, &new).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::CapabilityNotFound {
                labelled_name: NAME.to_string(),
                version: VERSION.to_string(),
            }
        );
    }

    #[rstest]
    #[case::wrong_version(NAME, "1.0.1")]
    #[case::wrong_name("ccip-v2", VERSION)]
    fn test_capability_lookup_is_exact(#[case] name: &str, #[case] version: &str) {
        let s = state(vec![]);
        assert!(matches!(
            diff(name, version, &s, &s),
            Err(ReconcileError::CapabilityNotFound { .. })
        ));
    }

    #[test]
    fn test_multi_capability_don_rejected() {
        let old = state(vec![]);
        let new = state(vec![don(7, &[ccip_id(), other_id()])]);

        let err = diff(NAME, VERSION, &old, &new).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::InvalidDonShape {
                don_id: DonId::new(7),
                configurations: 2,
            }
        );
        assert!(err.is_data_integrity());
    }

    #[test]
    fn test_malformed_old_snapshot_aborts() {
        let old = state(vec![don(7, &[ccip_id(), other_id()])]);
        let new = state(vec![don(8, &[ccip_id()])]);

        assert!(diff(NAME, VERSION, &old, &new).is_err());
    }

    #[test]
    fn test_filter_ccip_dons_keys_by_id() {
        let s = state(vec![don(3, &[ccip_id()]), don(9, &[ccip_id()]), don(4, &[])]);
        let dons = filter_ccip_dons(&s, &ccip_id()).unwrap();
        assert_eq!(
            dons.keys().copied().collect::<Vec<_>>(),
            vec![DonId::new(3), DonId::new(9)]
        );
    }

    fn arb_snapshot() -> impl Strategy<Value = RegistryState> {
        // Each DON id 0..16 is absent, a CCIP DON, or a DON hosting something else.
        proptest::collection::vec(0u8..3, 16).prop_map(|kinds| {
            let dons = kinds
                .into_iter()
                .enumerate()
                .filter_map(|(i, kind)| match kind {
                    1 => Some(don(i as u32, &[ccip_id()])),
                    2 => Some(don(i as u32, &[other_id()])),
                    _ => None,
                })
                .collect();
            state(dons)
        })
    }

    proptest! {
        #[test]
        fn prop_diff_is_deterministic(old in arb_snapshot(), new in arb_snapshot()) {
            let first = diff(NAME, VERSION, &old, &new).unwrap();
            let second = diff(NAME, VERSION, &old, &new).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_every_ccip_don_in_exactly_one_partition(
            old in arb_snapshot(),
            new in arb_snapshot(),
        ) {
            let d = diff(NAME, VERSION, &old, &new).unwrap();

            let mut expected: HashSet<DonId> = HashSet::new();
            for s in [&old, &new] {
                expected.extend(s.dons.iter().filter(|x| x.hosts(&ccip_id())).map(|x| x.id));
            }

            for id in &expected {
                let hits = [&d.added, &d.removed, &d.updated]
                    .iter()
                    .filter(|m| m.contains_key(id))
                    .count();
                prop_assert_eq!(hits, 1);
            }
            prop_assert_eq!(d.don_count(), expected.len());
        }
    }
}
