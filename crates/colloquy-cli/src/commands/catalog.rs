use crate::app::App;
use anyhow::Result;
use colloquy_core::entity::{EntityDetails, EntityKind, EntityMetadata};

pub fn list(app: &App, kind: Option<EntityKind>) -> Result<()> {
    let service = app.service()?;
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => vec![EntityKind::File, EntityKind::Prompt, EntityKind::Channel],
    };

    for kind in kinds {
        println!("{}s:", kind);
        let entities = service.list_entities(kind)?;
        if entities.is_empty() {
            println!("  (none)");
        }
        for entity in entities {
            println!("  {}", describe(&entity));
        }
    }
    Ok(())
}

pub fn add(app: &App, entity: EntityMetadata) -> Result<()> {
    let kind = entity.kind();
    let id = entity.id.clone();
    app.service()?.add_entity(entity)?;
    println!("Added {} '{}'", kind, id);
    Ok(())
}

pub fn remove(app: &App, kind: EntityKind, id: &str) -> Result<()> {
    if app.service()?.delete_entity(kind, id)? {
        println!("Removed {} '{}'", kind, id);
    } else {
        println!("No {} '{}'", kind, id);
    }
    Ok(())
}

fn describe(entity: &EntityMetadata) -> String {
    match &entity.details {
        EntityDetails::File {
            file_type,
            file_size,
        } => format!(
            "{}  {}  {}  {} bytes",
            entity.id, entity.name, file_type, file_size
        ),
        EntityDetails::Prompt { category } => {
            format!("{}  {}  [{}]", entity.id, entity.name, category)
        }
        EntityDetails::Channel => format!("{}  #{}", entity.id, entity.name),
    }
}
