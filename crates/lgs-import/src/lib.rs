//! lgs-import
//!
//! Loads one state's scraper output from disk, runs it through the per-state
//! filter pipelines and replaces each entity type's Current generation.
//! Old and Live are never touched here.

mod filters;
mod names;
mod source;

pub use filters::{Document, Filter, FilterRegistryError, Pipeline};
pub use names::{split_name, NameParts};
pub use source::{
    read_dir_sorted, read_single, SourceBatch, BILLS_DIR, LEGISLATORS_DIR, METADATA_FILE,
};

use anyhow::{Context, Result};
use lgs_config::ImportSettings;
use lgs_schemas::{EntityType, Record, Scope, StateCode};
use lgs_store::GenerationStore;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntityImport {
    pub files: usize,
    pub unreadable: usize,
    /// Documents dropped by filters (duplicate keys).
    pub dropped: usize,
    /// Documents written to Current.
    pub written: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImportReport {
    pub state: StateCode,
    /// Entity types that had scraper output, in run order.
    pub entities: Vec<(EntityType, EntityImport)>,
}

impl ImportReport {
    pub fn entity(&self, entity: EntityType) -> Option<&EntityImport> {
        self.entities.iter().find(|(e, _)| *e == entity).map(|(_, i)| i)
    }
}

struct Pipelines {
    metadata: Pipeline,
    bills: Pipeline,
    legislators: Pipeline,
}

impl Pipelines {
    fn resolve(state: &StateCode, settings: &ImportSettings) -> Result<Self, FilterRegistryError> {
        let f = settings.filters_for(state.as_str());
        Ok(Self {
            metadata: Pipeline::resolve(EntityType::Metadata, state, &f.metadata)?,
            bills: Pipeline::resolve(EntityType::Bill, state, &f.bills)?,
            legislators: Pipeline::resolve(EntityType::Legislator, state, &f.legislators)?,
        })
    }

    fn for_entity(&self, entity: EntityType) -> &Pipeline {
        match entity {
            EntityType::Metadata => &self.metadata,
            EntityType::Legislator => &self.legislators,
            EntityType::Bill => &self.bills,
        }
    }
}

fn load(state_dir: &Path, entity: EntityType) -> Result<Option<SourceBatch>> {
    match entity {
        EntityType::Metadata => Ok(read_single(&state_dir.join(METADATA_FILE))?.map(|doc| {
            SourceBatch {
                documents: vec![doc],
                files: 1,
                unreadable: 0,
            }
        })),
        EntityType::Legislator => read_dir_sorted(&state_dir.join(LEGISLATORS_DIR)),
        EntityType::Bill => read_dir_sorted(&state_dir.join(BILLS_DIR)),
    }
}

/// Import `<data_dir>/<state>` into the Current generations of `state`.
///
/// Filter names are resolved first, so a configuration error writes
/// nothing. Entity types without scraper output keep their Current as is.
pub async fn import_state(
    store: &dyn GenerationStore,
    settings: &ImportSettings,
    state: &StateCode,
) -> Result<ImportReport> {
    let pipelines = Pipelines::resolve(state, settings)
        .with_context(|| format!("import filters for {state}"))?;
    let state_dir = settings.data_dir.join(state.as_str());
    info!(state = %state, dir = %state_dir.display(), "import started");

    let mut entities = Vec::new();
    for entity in EntityType::RUN_ORDER {
        let Some(batch) = load(&state_dir, entity)? else {
            info!(state = %state, %entity, "no scraper output");
            continue;
        };

        let mut docs = batch.documents;
        if entity == EntityType::Metadata {
            for d in &mut docs {
                d.entry("abbreviation")
                    .or_insert_with(|| Value::String(state.as_str().to_string()));
            }
        }
        let (docs, dropped) = pipelines.for_entity(entity).apply(docs);

        let records: Vec<Record> = docs.into_iter().map(Record::scraped).collect();
        let written = records.len();
        let scope = Scope::new(state, entity);
        store
            .write_current(&scope, records)
            .await
            .with_context(|| format!("write current {scope}"))?;

        info!(
            %scope,
            files = batch.files,
            written,
            dropped,
            unreadable = batch.unreadable,
            "current generation replaced"
        );
        entities.push((
            entity,
            EntityImport {
                files: batch.files,
                unreadable: batch.unreadable,
                dropped,
                written,
            },
        ));
    }

    Ok(ImportReport {
        state: state.clone(),
        entities,
    })
}
