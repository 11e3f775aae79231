use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::CellAddress;
use crate::value::CellValue;

/// The reconciler's last-observed remote state, used as the diff baseline.
///
/// Internally a `BTreeMap` (not a `HashMap`) so that iteration, and therefore
/// any derived output such as a diff, is always produced in row-major
/// address order — the diff algorithm's stability does not rely on this,
/// but deterministic iteration makes test assertions and logs
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot(BTreeMap<CellAddress, CellValue>);

/// `CellAddress` serializes as a struct, which `serde_json` (and most other
/// self-describing formats) cannot use as a map key, so `Snapshot` cannot
/// derive `Serialize`/`Deserialize` directly. Both sides go through the
/// canonical `"<row>:<col>"` string form `CellAddress` already has via
/// `Display`/`FromStr`.
impl Serialize for Snapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (address, value) in &self.0 {
            map.serialize_entry(&address.to_string(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of \"<row>:<col>\" cell addresses to values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut snapshot = Snapshot::new();
                while let Some((key, value)) = access.next_entry::<String, CellValue>()? {
                    let address: CellAddress = key.parse().map_err(serde::de::Error::custom)?;
                    snapshot.set(address, value);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, address: &CellAddress) -> Option<&CellValue> {
        self.0.get(address)
    }

    /// Value at `address`, treating an absent entry as the empty string —
    /// the convention the diff algorithm and store boundary both rely on.
    pub fn value_or_empty(&self, address: &CellAddress) -> &str {
        self.0.get(address).map(CellValue::as_str).unwrap_or("")
    }

    pub fn set(&mut self, address: CellAddress, value: CellValue) {
        if value.is_empty() {
            self.0.remove(&address);
        } else {
            self.0.insert(address, value);
        }
    }

    pub fn remove(&mut self, address: &CellAddress) {
        self.0.remove(address);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellAddress, &CellValue)> {
        self.0.iter()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &CellAddress> {
        self.0.keys()
    }
}

impl FromIterator<(CellAddress, CellValue)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (CellAddress, CellValue)>>(iter: T) -> Self {
        let mut snap = Self::new();
        for (addr, val) in iter {
            snap.set(addr, val);
        }
        snap
    }
}

/// The result of comparing a current [`Snapshot`] `current` against a
/// previous one `previous`: addresses whose value changed (including
/// newly-appearing addresses), and addresses that disappeared or went
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub changes: Vec<(CellAddress, CellValue)>,
    pub deletions: Vec<CellAddress>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.deletions.is_empty()
    }
}

/// Compare `current` against `previous`:
///
/// - every address in `current` whose value differs from `previous` (empty
///   if absent there) is a change;
/// - every address in `previous` with a non-empty value that is absent or
///   empty in `current` is a deletion.
///
/// Trailing-empty and absent are the same input to this function by
/// construction: [`Snapshot`] never stores an empty value (see
/// [`Snapshot::set`]), so "absent" and "empty" cannot be distinguished here
/// and the diff is stable under any reordering of how the two snapshots
/// were populated.
pub fn diff(current: &Snapshot, previous: &Snapshot) -> SnapshotDiff {
    let mut out = SnapshotDiff::default();

    for (addr, value) in current.iter() {
        if previous.value_or_empty(addr) != value.as_str() {
            out.changes.push((*addr, value.clone()));
        }
    }

    for addr in previous.addresses() {
        if current.get(addr).is_none() {
            out.deletions.push(*addr);
        }
    }

    out
}
