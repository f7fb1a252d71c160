//! User and group ID mapping tables for the sandbox's user namespace

use std::str::FromStr;
use thiserror::Error;

/// Maximum number of entries one mapping table holds
pub const MAP_CAPACITY: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdMapError {
    #[error("Mapping table full: at most {MAP_CAPACITY} entries")]
    CapacityExceeded,

    #[error("Invalid mapping format '{0}', expected INSIDE:OUTSIDE")]
    InvalidMapping(String),
}

/// One identity pair: the ID a process sees inside the namespace and the
/// ID it corresponds to outside. Always covers exactly one ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapEntry {
    pub inside: u32,
    pub outside: u32,
}

impl FromStr for IdMapEntry {
    type Err = IdMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (inside, outside) = s
            .split_once(':')
            .ok_or_else(|| IdMapError::InvalidMapping(s.to_string()))?;
        let inside = inside
            .parse()
            .map_err(|_| IdMapError::InvalidMapping(s.to_string()))?;
        let outside = outside
            .parse()
            .map_err(|_| IdMapError::InvalidMapping(s.to_string()))?;
        Ok(Self { inside, outside })
    }
}

/// Ordered, append-only mapping table for one ID kind (user or group),
/// capped at [`MAP_CAPACITY`] entries. Built once from the command line,
/// consumed once when the launcher writes it into the kernel.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    entries: Vec<IdMapEntry>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one mapping. A full table is a configuration error and the
    /// table stays untouched, entries are never dropped or resized away.
    pub fn append(&mut self, inside: u32, outside: u32) -> Result<(), IdMapError> {
        if self.entries.len() == MAP_CAPACITY {
            return Err(IdMapError::CapacityExceeded);
        }
        self.entries.push(IdMapEntry { inside, outside });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the payload the kernel expects in `uid_map`/`gid_map`: one
    /// `inside outside 1` line per entry, in append order.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} {} 1\n", e.inside, e.outside))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_entry_in_append_order() {
        let mut map = IdMap::new();
        map.append(0, 1000).unwrap();
        map.append(5, 1005).unwrap();
        assert_eq!(map.render(), "0 1000 1\n5 1005 1\n");
    }

    #[test]
    fn every_line_maps_a_single_id() {
        let mut map = IdMap::new();
        for n in 0..MAP_CAPACITY as u32 {
            map.append(n, 1000 + n).unwrap();
        }
        let rendered = map.render();
        assert_eq!(rendered.lines().count(), MAP_CAPACITY);
        assert!(rendered.lines().all(|line| line.ends_with(" 1")));
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(IdMap::new().render(), "");
    }

    #[test]
    fn append_past_capacity_fails_without_mutating() {
        let mut map = IdMap::new();
        for n in 0..MAP_CAPACITY as u32 {
            map.append(n, n).unwrap();
        }
        let before = map.render();
        assert_eq!(map.append(99, 99), Err(IdMapError::CapacityExceeded));
        assert_eq!(map.len(), MAP_CAPACITY);
        assert_eq!(map.render(), before);
    }

    #[test]
    fn parses_well_formed_pairs() {
        let entry: IdMapEntry = "0:1000".parse().unwrap();
        assert_eq!(
            entry,
            IdMapEntry {
                inside: 0,
                outside: 1000
            }
        );
    }

    #[test]
    fn rejects_malformed_pairs() {
        for bad in ["", "0", "0:", ":1000", "a:b", "-1:5", "1:2:3", " 0:1"] {
            assert!(bad.parse::<IdMapEntry>().is_err(), "{bad:?} should not parse");
        }
    }
}
