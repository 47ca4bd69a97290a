//! Layout reordering for cache locality, and the mapping artifact it emits.
//!
//! After build, node ids reflect insertion order, so a beam search hops
//! around memory. The reorder pass walks the layer-0 graph breadth-first
//! from the entry point, assigns new sequential internal ids in visitation
//! order, and permutes vector storage and every adjacency list in one
//! explicit pass. Neighboring nodes then sit at nearby addresses and the
//! beam touches memory in roughly increasing order.
//!
//! Search results afterwards are in internal-id space; the emitted
//! [`LayoutMapping`] (internal → original id) is what recall scoring uses to
//! translate back. The permutation is pure relabeling: result *sets* are
//! unchanged for any query and `ef`.

use super::graph::HnswGraph;
use super::layer::Layer;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAPPING_MAGIC: [u8; 4] = *b"SVMP";
const MAPPING_VERSION: u32 = 1;

/// Bijection from internal (post-reorder) id to original dataset id.
///
/// Persisted as: magic `SVMP`, little-endian `u32` version, `u64` count, then
/// `count` little-endian `u64` entries; entry `i` is the original id of the
/// vector at internal position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMapping {
    entries: Vec<u64>,
}

impl LayoutMapping {
    /// Wraps a raw internal→original table.
    #[must_use]
    pub fn from_entries(entries: Vec<u64>) -> Self {
        Self { entries }
    }

    /// The internal→original table.
    #[must_use]
    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    /// Number of mapped ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Translates one internal id to its original id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mapping`] if the id is out of range, which means the
    /// mapping belongs to a different (or differently sized) index.
    pub fn translate(&self, internal: u64) -> Result<u64> {
        usize::try_from(internal)
            .ok()
            .and_then(|i| self.entries.get(i).copied())
            .ok_or_else(|| {
                Error::Mapping(format!(
                    "internal id {internal} out of range for mapping of {} entries",
                    self.entries.len()
                ))
            })
    }

    /// Writes the mapping file atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Fails on IO errors; no partial file is left behind.
    pub fn write(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        let result = (|| -> Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(&MAPPING_MAGIC)?;
            writer.write_all(&MAPPING_VERSION.to_le_bytes())?;
            writer.write_all(&(self.entries.len() as u64).to_le_bytes())?;
            for &entry in &self.entries {
                writer.write_all(&entry.to_le_bytes())?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })();
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
            return result;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Reads and validates a mapping file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mapping`] on bad magic, unsupported version, or a
    /// truncated entry table; [`Error::Io`] if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAPPING_MAGIC {
            return Err(Error::Mapping(format!(
                "'{}' is not a layout mapping file (bad magic)",
                path.display()
            )));
        }

        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;
        let version = u32::from_le_bytes(word);
        if version != MAPPING_VERSION {
            return Err(Error::Mapping(format!(
                "unsupported mapping version {version} (expected {MAPPING_VERSION})"
            )));
        }

        let mut long = [0u8; 8];
        reader.read_exact(&mut long)?;
        let count = u64::from_le_bytes(long) as usize;

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            reader.read_exact(&mut long).map_err(|_| {
                Error::Mapping(format!(
                    "truncated mapping file '{}': expected {count} entries",
                    path.display()
                ))
            })?;
            entries.push(u64::from_le_bytes(long));
        }

        Ok(Self { entries })
    }
}

impl HnswGraph {
    /// Relabels the graph in BFS order of the layer-0 adjacency.
    ///
    /// Returns `order`, where `order[new_id]` is the id each node held before
    /// this pass. Nodes unreachable from the entry point (disconnected
    /// components, if any) are appended in their previous order so the
    /// relabeling stays a bijection.
    pub(crate) fn reorder_bfs(&mut self) -> Vec<usize> {
        let n = self.vectors.len();
        if n == 0 {
            return Vec::new();
        }

        let mut order = Vec::with_capacity(n);
        let mut seen = vec![false; n];
        let mut queue = VecDeque::new();

        if let Some(entry) = self.entry {
            seen[entry] = true;
            queue.push_back(entry);
        }
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &nb in self.layers[0].neighbors(node) {
                if !seen[nb] {
                    seen[nb] = true;
                    queue.push_back(nb);
                }
            }
        }
        for node in 0..n {
            if !seen[node] {
                order.push(node);
            }
        }
        debug_assert_eq!(order.len(), n);

        // perm: previous id -> new id.
        let mut perm = vec![0usize; n];
        for (new_id, &prev) in order.iter().enumerate() {
            perm[prev] = new_id;
        }

        let mut vectors = vec![Vec::new(); n];
        for (new_id, &prev) in order.iter().enumerate() {
            vectors[new_id] = std::mem::take(&mut self.vectors[prev]);
        }
        self.vectors = vectors;

        for layer in &mut self.layers {
            let mut neighbors = vec![Vec::new(); n];
            for (prev, list) in layer.neighbors.drain(..).enumerate() {
                neighbors[perm[prev]] = list.into_iter().map(|nb| perm[nb]).collect();
            }
            layer.neighbors = neighbors;
        }

        self.entry = self.entry.map(|e| perm[e]);
        order
    }
}
