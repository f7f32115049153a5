//! `lgs lookup <STATE> <ENTITY> <ID>`: read one Live document.

use anyhow::{anyhow, bail, Result};
use lgs_db::PgStore;
use lgs_schemas::{EntityType, Scope};
use lgs_store::GenerationStore;

use super::{connect, load_config, parse_state, print_json};

pub async fn run(config_paths: &[String], state: &str, entity: &str, id: &str) -> Result<()> {
    let state = parse_state(state)?;
    let entity = EntityType::parse(entity)
        .ok_or_else(|| {
            anyhow!("invalid entity '{entity}': expected metadata | legislator | bill")
        })?;
    let loaded = load_config(config_paths)?;

    let store = PgStore::new(connect(&loaded).await?);
    let scope = Scope::new(&state, entity);
    match store.live_get(&scope, id).await? {
        Some(record) => print_json(&record.to_document(entity)),
        None => bail!("no live {entity} with id '{id}' in {state}"),
    }
}
