use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use facet::Facet;
use hookscope_search::{Console, ExecutionCounts, RecordStore};
use hookscope_types::Record;

use crate::context::{ContextHandle, ContextKind, ContextOptions};
use crate::mesh::{Mesh, TopologyError};

/// Declarative context tree, listed parents first.
#[derive(Facet, Debug, Clone)]
pub struct Topology {
    pub contexts: Vec<ContextEntry>,
}

#[derive(Facet, Debug, Clone)]
pub struct ContextEntry {
    /// Unique within the topology.
    pub name: String,

    pub kind: ContextKind,

    /// Location of the context, shown in result headers.
    #[facet(default)]
    pub address: Option<String>,

    /// Page whose document embeds this one as a frame.
    #[facet(default)]
    pub embedded_in: Option<String>,

    /// Context that spawned this worker.
    #[facet(default)]
    pub spawned_by: Option<String>,

    #[facet(default)]
    pub records: Vec<Record>,

    #[facet(default)]
    pub execution_counts: Vec<ExecutionCount>,
}

#[derive(Facet, Debug, Clone)]
pub struct ExecutionCount {
    pub code_location: String,
    pub count: u64,
}

impl Topology {
    pub fn from_json(json: &str) -> Result<Self, TopologyError> {
        facet_json::from_str(json).map_err(|error| TopologyError::Decode(error.to_string()))
    }
}

impl Mesh {
    /// Spawns every context in `topology` and wires frames and workers.
    pub fn build(
        &self,
        topology: &Topology,
        console_for: impl Fn(&ContextEntry) -> Arc<dyn Console>,
    ) -> Result<BTreeMap<String, ContextHandle>, TopologyError> {
        let mut built: BTreeMap<String, ContextHandle> = BTreeMap::new();
        for entry in &topology.contexts {
            if built.contains_key(&entry.name) {
                return Err(TopologyError::DuplicateName(entry.name.clone()));
            }
            let lookup = |name: &String| {
                built
                    .get(name)
                    .ok_or_else(|| TopologyError::UnknownContext(name.clone()))
            };

            let mut options = ContextOptions::new(console_for(entry))
                .store(RecordStore::from_records(entry.records.clone()))
                .counts(ExecutionCounts::from_map(
                    entry
                        .execution_counts
                        .iter()
                        .map(|c| (c.code_location.clone(), c.count))
                        .collect::<HashMap<_, _>>(),
                ));
            options.address = entry.address.clone();

            let handle = match (entry.kind, &entry.embedded_in, &entry.spawned_by) {
                (_, Some(_), Some(_)) => {
                    return Err(TopologyError::ConflictingParents(entry.name.clone()));
                }
                (ContextKind::Page, None, None) => self.spawn_page(options),
                (ContextKind::Page, Some(parent), None) => {
                    let parent = lookup(parent)?;
                    self.spawn_frame(parent, options)?
                }
                (ContextKind::Worker, None, Some(owner)) => {
                    let owner = lookup(owner)?;
                    self.spawn_worker(owner, options)
                }
                (ContextKind::Worker, None, None) => self.spawn_detached_worker(options),
                (ContextKind::Page, None, Some(_)) => {
                    return Err(TopologyError::KindMismatch {
                        name: entry.name.clone(),
                        expected: ContextKind::Worker,
                    });
                }
                (ContextKind::Worker, Some(_), None) => {
                    return Err(TopologyError::KindMismatch {
                        name: entry.name.clone(),
                        expected: ContextKind::Page,
                    });
                }
            };
            built.insert(entry.name.clone(), handle);
        }
        Ok(built)
    }
}
