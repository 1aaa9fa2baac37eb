//! Command implementations

use std::error::Error;

use datafinder_core::metadata::decode;
use datafinder_core::persistence::normalize_identifier;
use datafinder_core::{
    CellData, Column, PersistenceError, PropertiesModel, PropertyCategory, PropertyGateway,
    PropertyType, Repository, Value, ValueKind,
};

type CommandResult = Result<(), Box<dyn Error>>;

pub fn definitions(repo: &Repository) -> CommandResult {
    for definition in repo.registry().list() {
        println!(
            "{:<36} {:<16} {:<9}{}",
            definition.identifier,
            category_name(definition.category),
            definition.property_type,
            if definition.not_null { " required" } else { "" }
        );
    }
    Ok(())
}

pub fn describe(repo: &Repository, name: &str) -> CommandResult {
    let definition = repo
        .registry()
        .get(name)
        .ok_or_else(|| format!("no definition for '{}'", name))?;
    println!("{}", serde_json::to_string_pretty(definition)?);
    Ok(())
}

pub fn list(repo: &Repository, item: &str) -> CommandResult {
    let item = resolve_item(repo, item)?;
    let mut model = PropertiesModel::new(repo);
    model.load_item(&item)?;
    for entry in model.entries() {
        println!(
            "{}{:<30} {:<9} {}",
            if entry.state.required_not_set { "!" } else { " " },
            entry.name,
            entry.type_name,
            entry.value
        );
    }
    if !model.is_consistent() {
        eprintln!("Properties marked with '!' are missing or invalid");
    }
    Ok(())
}

pub fn set(
    repo: &Repository,
    item: &str,
    name: &str,
    text: &str,
    property_type: Option<&str>,
) -> CommandResult {
    let requested = property_type
        .map(|t| PropertyType::from_name(t).ok_or_else(|| format!("unknown type '{}'", t)))
        .transpose()?;

    let item = resolve_item(repo, item)?;
    let mut model = PropertiesModel::new(repo);
    model.load_item(&item)?;

    let row = match model.find(name) {
        Some(row) => row,
        None => {
            let row = model.add()?;
            model.set_data(row, CellData::Name(name.to_string()))?;
            row
        }
    };

    if let Some(requested) = requested {
        let current = model.entry(row).map(|e| e.type_name);
        if current != Some(requested) && model.is_editable(row, Column::Type) {
            model.set_data(row, CellData::Type(requested))?;
        }
    }

    let declared = requested.or_else(|| {
        repo.registry()
            .get(name)
            .map(|d| d.property_type)
            .filter(|t| *t != PropertyType::Any)
    });
    let value = parse_value(text, declared)?;
    model.set_data(row, CellData::Value(value))?;
    save_checked(&mut model)
}

pub fn delete(repo: &Repository, item: &str, names: &[String]) -> CommandResult {
    let item = resolve_item(repo, item)?;
    let mut model = PropertiesModel::new(repo);
    model.load_item(&item)?;
    for name in names {
        let row = model
            .find(name)
            .ok_or_else(|| format!("'{}' has no property '{}'", item, name))?;
        model.remove(row)?;
    }
    save_checked(&mut model)
}

fn save_checked<G: PropertyGateway + ?Sized>(model: &mut PropertiesModel<'_, G>) -> CommandResult {
    if !model.is_consistent() {
        let invalid: Vec<_> = model
            .entries()
            .iter()
            .filter(|e| e.state.required_not_set)
            .map(|e| e.identifier().to_string())
            .collect();
        return Err(format!(
            "refusing to save inconsistent properties: {}",
            invalid.join(", ")
        )
        .into());
    }
    model.save()?;
    Ok(())
}

/// Accepts an item path below the repository root or a full item URI.
fn resolve_item(repo: &Repository, item: &str) -> Result<String, PersistenceError> {
    if !item.contains("://") {
        return normalize_identifier(item);
    }
    let configuration = repo.file_system().configuration().ok_or_else(|| {
        PersistenceError::Unsupported("no repository is configured".to_string())
    })?;
    configuration.identifier_for(item)
}

/// Reads command line text as a value.
///
/// With a type the text is decoded like a persisted value of that type.
/// Without one, JSON literals are typed and anything else is a string.
pub fn parse_value(text: &str, property_type: Option<PropertyType>) -> Result<Value, String> {
    let Some(kind) = property_type.and_then(|t| t.value_kind()) else {
        return match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => Value::try_from(json).map_err(|e| e.to_string()),
            Err(_) => Ok(Value::from(text)),
        };
    };
    if kind == ValueKind::Bool {
        match text.to_ascii_lowercase().as_str() {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }
    }
    let value = decode(text, Some(kind));
    if value.is_none() || value.kind() == kind {
        Ok(value)
    } else {
        Err(format!("cannot read '{}' as {}", text, kind.name()))
    }
}

fn category_name(category: PropertyCategory) -> &'static str {
    match category {
        PropertyCategory::UnmanagedSystem => "unmanaged-system",
        PropertyCategory::ManagedSystem => "managed-system",
        PropertyCategory::DataModel => "data-model",
        PropertyCategory::User => "user",
        PropertyCategory::Unknown => "unknown",
    }
}
