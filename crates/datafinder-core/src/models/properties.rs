//! # Property Edit Model
//!
//! Tabular editing state for the properties of one item. Rows are loaded from
//! a [`PropertyGateway`], edited in memory and written back in a single
//! [`PropertiesModel::save`] call.
//!
//! Every row has a fixed [`RowCategory`] (system, data model or custom) and a
//! mutable [`RowState`]. Rows added by the user have no category until they
//! are saved and bound to a definition.
//!
//! After each mutation the model re-validates all rows through the gateway.
//! Rows that fail are flagged `required_not_set` and the model reports itself
//! inconsistent; callers should refuse to save an inconsistent model.

use std::cmp::Ordering;

use crate::error::ModelError;
use crate::metadata::Value;
use crate::property::{Property, PropertyCategory, PropertyDefinition, PropertyType};
use crate::repository::PropertyGateway;

/// Fixed classification of a row, derived from its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowCategory {
    System,
    Data,
    Custom,
}

impl RowCategory {
    /// `None` for categories the model does not display.
    pub fn from_category(category: PropertyCategory) -> Option<Self> {
        match category {
            PropertyCategory::UnmanagedSystem | PropertyCategory::ManagedSystem => {
                Some(RowCategory::System)
            }
            PropertyCategory::DataModel => Some(RowCategory::Data),
            PropertyCategory::User => Some(RowCategory::Custom),
            PropertyCategory::Unknown => None,
        }
    }
}

/// Lifecycle flags of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowState {
    /// Added by the user, not yet persisted.
    pub new: bool,
    pub edited: bool,
    /// Marked for deletion on the next save.
    pub deleted: bool,
    /// The row failed the last consistency check.
    pub required_not_set: bool,
}

impl RowState {
    pub fn is_dirty(&self) -> bool {
        self.new || self.edited || self.deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Type,
    Value,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Name, Column::Type, Column::Value];

    pub fn header(&self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Type => "Type",
            Column::Value => "Value",
        }
    }
}

/// New content of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellData {
    Name(String),
    Type(PropertyType),
    Value(Value),
}

impl CellData {
    pub fn column(&self) -> Column {
        match self {
            CellData::Name(_) => Column::Name,
            CellData::Type(_) => Column::Type,
            CellData::Value(_) => Column::Value,
        }
    }
}

/// One row of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    /// Display name; the identifier the user typed for new rows.
    pub name: String,
    /// Type shown to the user.
    pub type_name: PropertyType,
    pub value: Value,
    /// `None` exactly for rows added by the user and not saved yet.
    pub definition: Option<PropertyDefinition>,
    pub declared_type: PropertyType,
    /// Value at load time, restored by revert.
    pub original_value: Value,
    pub category: Option<RowCategory>,
    pub state: RowState,
}

impl PropertyEntry {
    fn blank() -> Self {
        Self {
            name: String::new(),
            type_name: PropertyType::String,
            value: Value::None,
            definition: None,
            declared_type: PropertyType::Any,
            original_value: Value::None,
            category: None,
            state: RowState {
                new: true,
                ..Default::default()
            },
        }
    }

    /// Identifier of the bound definition, else the typed name.
    pub fn identifier(&self) -> &str {
        match &self.definition {
            Some(definition) => &definition.identifier,
            None => &self.name,
        }
    }

    pub fn is_system(&self) -> bool {
        self.category == Some(RowCategory::System)
    }

    fn is_user_editable(&self) -> bool {
        matches!(self.category, Some(RowCategory::Data | RowCategory::Custom))
    }

    fn display(&self, column: Column) -> String {
        match column {
            Column::Name => self.name.clone(),
            Column::Type => self.type_name.name().to_string(),
            Column::Value => self.value.to_string(),
        }
    }
}

/// Type shown for a declared type and value: `Any` is replaced by the
/// concrete type of the value, unset values show as strings.
fn display_type(declared: PropertyType, value: &Value) -> PropertyType {
    if declared != PropertyType::Any {
        return declared;
    }
    PropertyType::from_value(value).unwrap_or(PropertyType::String)
}

/// Edit model over the properties of one item.
pub struct PropertiesModel<'a, G: PropertyGateway + ?Sized> {
    gateway: &'a G,
    entries: Vec<PropertyEntry>,
    item: Option<String>,
    item_name: String,
    read_only: bool,
    consistent: bool,
    sort_column: Column,
    sort_ascending: bool,
}

impl<'a, G: PropertyGateway + ?Sized> PropertiesModel<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            entries: Vec::new(),
            item: None,
            item_name: String::new(),
            read_only: false,
            consistent: true,
            sort_column: Column::Name,
            sort_ascending: true,
        }
    }

    /// Replaces all rows with the given properties.
    ///
    /// Properties of unknown category are dropped, as are repeated
    /// identifiers (the first occurrence wins).
    pub fn load(&mut self, properties: impl IntoIterator<Item = Property>) {
        self.entries.clear();
        for property in properties {
            let definition = property.definition;
            let Some(category) = RowCategory::from_category(definition.category) else {
                tracing::debug!("Ignoring property '{}' of unknown category", definition.identifier);
                continue;
            };
            if self
                .entries
                .iter()
                .any(|e| e.identifier() == definition.identifier)
            {
                continue;
            }
            self.entries.push(PropertyEntry {
                name: definition.display_name().to_string(),
                type_name: display_type(definition.property_type, &property.value),
                value: property.value.clone(),
                declared_type: definition.property_type,
                original_value: property.value,
                definition: Some(definition),
                category: Some(category),
                state: RowState::default(),
            });
        }
        self.check_consistency();
    }

    /// Loads the stored properties of `item` plus the required data model
    /// properties it does not carry yet.
    pub fn load_item(&mut self, item: &str) -> Result<(), ModelError> {
        let mut properties = self.gateway.retrieve_properties(item)?;
        properties.extend(
            self.gateway
                .required_definitions()
                .into_iter()
                .map(Property::from),
        );
        self.read_only = !self.gateway.can_store_properties(item);
        self.item_name = item.rsplit('/').next().unwrap_or_default().to_string();
        self.item = Some(item.to_string());
        self.load(properties);
        self.apply_sort();
        tracing::debug!("Loaded {} properties of {}", self.entries.len(), item);
        Ok(())
    }

    /// Reloads the bound item, discarding unsaved changes.
    pub fn refresh(&mut self) -> Result<(), ModelError> {
        match self.item.clone() {
            Some(item) => self.load_item(&item),
            None => Ok(()),
        }
    }

    /// Drops all rows and the item binding.
    pub fn clear(&mut self) {
        self.item = None;
        self.item_name.clear();
        self.read_only = false;
        self.entries.clear();
        self.consistent = true;
    }

    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn row_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, row: usize) -> Option<&PropertyEntry> {
        self.entries.get(row)
    }

    pub fn entries(&self) -> &[PropertyEntry] {
        &self.entries
    }

    /// Row of the property with the given identifier.
    pub fn find(&self, identifier: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.identifier() == identifier)
    }

    pub fn is_dirty(&self) -> bool {
        self.entries.iter().any(|e| e.state.is_dirty())
    }

    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    pub fn has_custom_metadata_support(&self) -> bool {
        self.gateway.capabilities().custom_metadata
    }

    /// Appends a blank new row and returns its position.
    pub fn add(&mut self) -> Result<usize, ModelError> {
        self.ensure_writable()?;
        self.entries.push(PropertyEntry::blank());
        self.check_consistency();
        Ok(self.entries.len() - 1)
    }

    /// Changes one cell.
    ///
    /// Returns `false` when the row was removed: clearing the name of a new
    /// row discards it.
    pub fn set_data(&mut self, row: usize, data: CellData) -> Result<bool, ModelError> {
        self.ensure_row(row)?;
        let column = data.column();
        if !self.is_editable(row, column) {
            return Err(ModelError::InvalidOperation(format!(
                "column '{}' of row {} is not editable",
                column.header(),
                row
            )));
        }

        let entry = &mut self.entries[row];
        let changed = match data {
            CellData::Name(name) => {
                let changed = entry.name != name;
                entry.name = name;
                changed
            }
            CellData::Type(property_type) => {
                let changed = entry.type_name != property_type;
                if changed {
                    entry.type_name = property_type;
                    entry.value = Value::None;
                }
                changed
            }
            CellData::Value(value) => {
                // true and 1 compare equal but persist differently
                let changed = entry.value != value || entry.value.kind() != value.kind();
                entry.value = value;
                changed
            }
        };

        if column == Column::Name && entry.state.new && entry.name.is_empty() {
            self.entries.remove(row);
            self.check_consistency();
            return Ok(false);
        }
        if changed {
            if !entry.state.new {
                entry.state.edited = true;
            }
            self.check_consistency();
        }
        Ok(true)
    }

    /// Unsets the value of a row.
    pub fn clear_value(&mut self, row: usize) -> Result<(), ModelError> {
        self.ensure_row(row)?;
        self.ensure_writable()?;
        let entry = &mut self.entries[row];
        if entry.is_system() || entry.state.deleted {
            return Err(ModelError::InvalidOperation(format!(
                "value of row {} cannot be cleared",
                row
            )));
        }
        if entry.value.is_none() {
            return Ok(());
        }
        entry.value = Value::None;
        if !entry.state.new {
            entry.state.edited = true;
        }
        self.check_consistency();
        Ok(())
    }

    /// Removes a new row immediately, or marks a custom property for deletion.
    pub fn remove(&mut self, row: usize) -> Result<(), ModelError> {
        self.ensure_row(row)?;
        self.ensure_writable()?;
        let entry = &mut self.entries[row];
        if entry.state.new {
            self.entries.remove(row);
            self.check_consistency();
        } else if entry.category == Some(RowCategory::Custom) {
            entry.state.deleted = true;
        } else {
            return Err(ModelError::InvalidOperation(format!(
                "property '{}' cannot be deleted",
                entry.identifier()
            )));
        }
        Ok(())
    }

    /// Undoes a pending deletion, or else restores the value at load time.
    pub fn revert(&mut self, row: usize) -> Result<(), ModelError> {
        self.ensure_row(row)?;
        let entry = &mut self.entries[row];
        if entry.state.deleted {
            entry.state.deleted = false;
        } else if entry.state.edited {
            entry.value = entry.original_value.clone();
            entry.type_name = display_type(entry.declared_type, &entry.value);
            entry.state.edited = false;
            self.check_consistency();
        }
        Ok(())
    }

    pub fn is_deletable(&self, row: usize) -> bool {
        self.entries.get(row).is_some_and(|e| {
            (e.state.new || e.category == Some(RowCategory::Custom))
                && !e.state.deleted
                && !self.read_only
        })
    }

    pub fn is_revertable(&self, row: usize) -> bool {
        self.entries
            .get(row)
            .is_some_and(|e| e.state.deleted || e.state.edited)
    }

    pub fn is_clearable(&self, row: usize) -> bool {
        self.entries
            .get(row)
            .is_some_and(|e| {
                !e.is_system() && !e.value.is_none() && !e.state.deleted && !self.read_only
            })
    }

    /// Whether a cell accepts [`set_data`](Self::set_data).
    ///
    /// New rows are editable everywhere. Values of data model and custom
    /// properties are editable, and so is their type if declared as `any`.
    pub fn is_editable(&self, row: usize, column: Column) -> bool {
        let Some(entry) = self.entries.get(row) else {
            return false;
        };
        if self.read_only || entry.state.deleted {
            return false;
        }
        entry.state.new
            || (entry.is_user_editable() && column == Column::Value)
            || (entry.is_user_editable()
                && column == Column::Type
                && entry.declared_type == PropertyType::Any)
    }

    /// Whether no row already uses `name` as identifier.
    pub fn is_property_name_unique(&self, name: &str) -> bool {
        !self.entries.iter().any(|e| e.identifier() == name)
    }

    /// Name check for new properties: valid for the backend and unique.
    pub fn is_valid_property_name(&self, name: &str) -> bool {
        self.gateway.is_valid_property_name(name) && self.is_property_name_unique(name)
    }

    /// Materializes every row as a property.
    pub fn properties(&self) -> Result<Vec<Property>, ModelError> {
        self.entries
            .iter()
            .map(|entry| self.materialize(entry))
            .collect()
    }

    /// Writes all pending changes with a single gateway update.
    ///
    /// Does nothing when the model is clean. On failure every row keeps its
    /// state so the save can be retried.
    pub fn save(&mut self) -> Result<(), ModelError> {
        if !self.is_dirty() {
            return Ok(());
        }
        let item = self
            .item
            .clone()
            .ok_or_else(|| ModelError::InvalidOperation("no item is loaded".to_string()))?;

        let mut upserts = Vec::new();
        let mut deletes = Vec::new();
        let mut created = Vec::new();
        for (row, entry) in self.entries.iter().enumerate() {
            if entry.state.deleted {
                deletes.push(entry.identifier().to_string());
            } else if entry.state.new {
                created.push((row, upserts.len()));
                upserts.push(self.gateway.create_property(&entry.name, entry.value.clone(), None)?);
            } else if entry.state.edited {
                upserts.push(self.materialize(entry)?);
            }
        }

        self.gateway.update_properties(&item, &upserts, &deletes)?;
        tracing::debug!(
            "Saved properties of {}: {} stored, {} deleted",
            item,
            upserts.len(),
            deletes.len()
        );

        for (row, index) in created {
            let definition = upserts[index].definition.clone();
            let entry = &mut self.entries[row];
            entry.name = definition.display_name().to_string();
            entry.declared_type = definition.property_type;
            entry.category = RowCategory::from_category(definition.category);
            entry.definition = Some(definition);
        }
        self.entries.retain(|e| !e.state.deleted);
        for entry in &mut self.entries {
            entry.original_value = entry.value.clone();
            entry.state.new = false;
            entry.state.edited = false;
        }
        Ok(())
    }

    /// Sorts the rows by the display text of a column, ignoring case.
    /// The order is kept across reloads.
    pub fn sort(&mut self, column: Column, ascending: bool) {
        self.sort_column = column;
        self.sort_ascending = ascending;
        self.apply_sort();
    }

    pub fn sort_order(&self) -> (Column, bool) {
        (self.sort_column, self.sort_ascending)
    }

    fn apply_sort(&mut self) {
        let column = self.sort_column;
        let ascending = self.sort_ascending;
        self.entries.sort_by(|a, b| {
            let ordering = compare_display(a, b, column);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }

    fn materialize(&self, entry: &PropertyEntry) -> Result<Property, ModelError> {
        let property = match &entry.definition {
            Some(definition) if !entry.state.new => self
                .gateway
                .create_property_from_definition(definition, entry.value.clone())?,
            _ => self
                .gateway
                .create_property(&entry.name, entry.value.clone(), None)?,
        };
        Ok(property)
    }

    /// Re-validates every row and updates the consistency flag.
    fn check_consistency(&mut self) {
        let mut consistent = true;
        for row in 0..self.entries.len() {
            let entry = &self.entries[row];
            let result = match &entry.definition {
                Some(definition) if !entry.state.new => self.gateway.create_property(
                    &definition.identifier,
                    entry.value.clone(),
                    definition.namespace.as_deref(),
                ),
                _ => self
                    .gateway
                    .create_property(&entry.name, entry.value.clone(), None),
            };
            let failed = match result {
                Ok(_) => false,
                Err(e) => {
                    tracing::debug!("Row {} is inconsistent: {}", row, e);
                    true
                }
            };
            self.entries[row].state.required_not_set = failed;
            consistent &= !failed;
        }
        if !consistent {
            tracing::warn!("Properties of '{}' are inconsistent", self.item_name);
        }
        self.consistent = consistent;
    }

    fn ensure_row(&self, row: usize) -> Result<(), ModelError> {
        if row < self.entries.len() {
            Ok(())
        } else {
            Err(ModelError::RowOutOfRange(row))
        }
    }

    fn ensure_writable(&self) -> Result<(), ModelError> {
        if self.read_only {
            Err(ModelError::InvalidOperation(format!(
                "properties of '{}' are read-only",
                self.item_name
            )))
        } else {
            Ok(())
        }
    }
}

fn compare_display(a: &PropertyEntry, b: &PropertyEntry, column: Column) -> Ordering {
    a.display(column)
        .to_lowercase()
        .cmp(&b.display(column).to_lowercase())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::error::{PersistenceError, PropertyError};
    use crate::metadata::ValueKind;
    use crate::persistence::Capabilities;
    use crate::property::registry::OWNER_ID;
    use crate::property::PropertyDefinitionRegistry;

    type Update = (String, Vec<Property>, Vec<String>);

    struct MockGateway {
        registry: PropertyDefinitionRegistry,
        stored: RefCell<Vec<Property>>,
        updates: RefCell<Vec<Update>>,
        fail_updates: Cell<bool>,
        writable: bool,
    }

    impl MockGateway {
        fn new() -> Self {
            let mut registry = PropertyDefinitionRegistry::with_system_properties();
            registry
                .register(
                    PropertyDefinition::new("project", PropertyCategory::DataModel, PropertyType::String)
                        .with_display_name("Project")
                        .required(),
                )
                .unwrap();
            registry
                .register(PropertyDefinition::new(
                    "comment",
                    PropertyCategory::DataModel,
                    PropertyType::Any,
                ))
                .unwrap();
            Self {
                registry,
                stored: RefCell::new(Vec::new()),
                updates: RefCell::new(Vec::new()),
                fail_updates: Cell::new(false),
                writable: true,
            }
        }

        fn property(&self, id: &str, value: impl Into<Value>) -> Property {
            self.registry.create_property(id, value.into(), None).unwrap()
        }

        fn with_stored(self, properties: Vec<Property>) -> Self {
            *self.stored.borrow_mut() = properties;
            self
        }

        fn update_count(&self) -> usize {
            self.updates.borrow().len()
        }
    }

    impl PropertyGateway for MockGateway {
        fn create_property(
            &self,
            identifier: &str,
            value: Value,
            namespace: Option<&str>,
        ) -> Result<Property, PropertyError> {
            self.registry.create_property(identifier, value, namespace)
        }

        fn create_property_from_definition(
            &self,
            definition: &PropertyDefinition,
            value: Value,
        ) -> Result<Property, PropertyError> {
            self.registry.create_property_from_definition(definition, value)
        }

        fn update_properties(
            &self,
            item: &str,
            upserts: &[Property],
            deletes: &[String],
        ) -> Result<(), PersistenceError> {
            if self.fail_updates.get() {
                return Err(PersistenceError::Storage("backend down".into()));
            }
            self.updates
                .borrow_mut()
                .push((item.to_string(), upserts.to_vec(), deletes.to_vec()));
            Ok(())
        }

        fn retrieve_properties(&self, _item: &str) -> Result<Vec<Property>, PersistenceError> {
            Ok(self.stored.borrow().clone())
        }

        fn required_definitions(&self) -> Vec<PropertyDefinition> {
            self.registry
                .list()
                .into_iter()
                .filter(|d| d.not_null)
                .cloned()
                .collect()
        }

        fn can_store_properties(&self, _item: &str) -> bool {
            self.writable
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                custom_metadata: true,
                ..Default::default()
            }
        }

        fn is_valid_property_name(&self, name: &str) -> bool {
            self.registry.is_valid_property_name(name)
        }
    }

    fn standard_gateway() -> MockGateway {
        let gw = MockGateway::new();
        let stored = vec![
            gw.property(OWNER_ID, "alice"),
            gw.property("project", "Apollo"),
            gw.property("note", "first"),
        ];
        gw.with_stored(stored)
    }

    fn loaded(gw: &MockGateway) -> PropertiesModel<'_, MockGateway> {
        let mut model = PropertiesModel::new(gw);
        model.load_item("/item").unwrap();
        model
    }

    fn row(model: &PropertiesModel<'_, MockGateway>, id: &str) -> usize {
        model.find(id).unwrap()
    }

    #[test]
    fn load_drops_duplicates_and_unknown_categories() {
        let gw = MockGateway::new();
        let mut unknown = gw.property("odd", "x");
        unknown.definition.category = PropertyCategory::Unknown;
        let mut model = PropertiesModel::new(&gw);
        model.load(vec![
            gw.property("note", "first"),
            gw.property("note", "second"),
            unknown,
            gw.property(OWNER_ID, "alice"),
        ]);

        assert_eq!(model.row_count(), 2);
        let note = model.entry(row(&model, "note")).unwrap();
        assert_eq!(note.value, Value::from("first"));
        assert_eq!(note.category, Some(RowCategory::Custom));
        assert_eq!(
            model.entry(row(&model, OWNER_ID)).unwrap().category,
            Some(RowCategory::System)
        );
        assert!(!model.is_dirty());
    }

    #[test]
    fn display_type_of_untyped_properties() {
        let gw = MockGateway::new();
        let mut model = PropertiesModel::new(&gw);
        model.load(vec![
            gw.property("count", 3),
            gw.property("empty", Value::None),
            gw.property("project", "Apollo"),
        ]);
        assert_eq!(model.entry(row(&model, "count")).unwrap().type_name, PropertyType::Number);
        assert_eq!(model.entry(row(&model, "empty")).unwrap().type_name, PropertyType::String);
        assert_eq!(model.entry(row(&model, "project")).unwrap().type_name, PropertyType::String);
    }

    #[test]
    fn load_item_adds_missing_required_properties() {
        let gw = MockGateway::new().with_stored(Vec::new());
        let model = loaded(&gw);
        assert_eq!(model.row_count(), 1);
        assert_eq!(model.entry(0).unwrap().identifier(), "project");
        assert_eq!(model.item_name(), "item");
        // required value is missing
        assert!(!model.is_consistent());
        assert!(model.entry(0).unwrap().state.required_not_set);
    }

    #[test]
    fn stored_value_wins_over_required_default() {
        let gw = standard_gateway();
        let model = loaded(&gw);
        assert_eq!(model.row_count(), 3);
        assert_eq!(
            model.entry(row(&model, "project")).unwrap().value,
            Value::from("Apollo")
        );
        assert!(model.is_consistent());
    }

    #[test]
    fn remove_system_row_fails() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let owner = row(&model, OWNER_ID);
        assert!(!model.is_deletable(owner));
        assert!(matches!(
            model.remove(owner),
            Err(ModelError::InvalidOperation(_))
        ));
        let project = row(&model, "project");
        assert!(model.remove(project).is_err());
    }

    #[test]
    fn remove_new_row_vanishes() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let added = model.add().unwrap();
        assert_eq!(model.row_count(), 4);
        assert!(model.is_deletable(added));
        model.remove(added).unwrap();
        assert_eq!(model.row_count(), 3);
        assert!(model.entries().iter().all(|e| !e.state.deleted));
        assert!(!model.is_dirty());
    }

    #[test]
    fn remove_custom_row_is_soft_and_revertable() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        model.remove(note).unwrap();
        assert!(model.entry(note).unwrap().state.deleted);
        assert!(!model.is_deletable(note));
        assert!(model.is_revertable(note));
        assert!(!model.is_editable(note, Column::Value));
        assert!(model.is_dirty());

        model.revert(note).unwrap();
        assert!(!model.entry(note).unwrap().state.deleted);
        assert!(!model.is_dirty());
    }

    #[test]
    fn edit_and_revert() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        assert!(model.set_data(note, CellData::Value(Value::from(42))).unwrap());
        let entry = model.entry(note).unwrap();
        assert!(entry.state.edited);
        assert_eq!(entry.value, Value::from(42));

        model.revert(note).unwrap();
        let entry = model.entry(note).unwrap();
        assert_eq!(entry.value, Value::from("first"));
        assert_eq!(entry.type_name, PropertyType::String);
        assert!(!model.is_revertable(note));
    }

    #[test]
    fn unchanged_value_does_not_mark_edited() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        model.set_data(note, CellData::Value(Value::from("first"))).unwrap();
        assert!(!model.is_dirty());
    }

    #[test]
    fn changing_type_clears_value() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        assert!(model.is_editable(note, Column::Type));
        model.set_data(note, CellData::Type(PropertyType::Number)).unwrap();
        let entry = model.entry(note).unwrap();
        assert_eq!(entry.value, Value::None);
        assert_eq!(entry.type_name, PropertyType::Number);
        assert!(entry.state.edited);

        // declared string type is fixed
        let project = row(&model, "project");
        assert!(!model.is_editable(project, Column::Type));
        assert!(model
            .set_data(project, CellData::Type(PropertyType::Number))
            .is_err());
    }

    #[test]
    fn names_are_editable_on_new_rows_only() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        assert!(!model.is_editable(note, Column::Name));
        assert!(model.set_data(note, CellData::Name("other".into())).is_err());

        let added = model.add().unwrap();
        assert!(model.is_editable(added, Column::Name));
        assert!(model.set_data(added, CellData::Name("fresh".into())).unwrap());
    }

    #[test]
    fn clearing_name_of_new_row_discards_it() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let added = model.add().unwrap();
        model.set_data(added, CellData::Name("fresh".into())).unwrap();
        assert!(!model.set_data(added, CellData::Name(String::new())).unwrap());
        assert_eq!(model.row_count(), 3);
        assert!(model.is_consistent());
    }

    #[test]
    fn blank_new_row_is_inconsistent() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let added = model.add().unwrap();
        assert!(!model.is_consistent());
        model.set_data(added, CellData::Name("fresh".into())).unwrap();
        assert!(model.is_consistent());
        assert!(!model.entry(added).unwrap().state.edited);
    }

    #[test]
    fn clear_value_checks_consistency() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let project = row(&model, "project");
        assert!(model.is_clearable(project));
        model.clear_value(project).unwrap();
        let entry = model.entry(project).unwrap();
        assert!(entry.state.edited);
        assert!(entry.state.required_not_set);
        assert!(!model.is_consistent());
        assert!(!model.is_clearable(project));

        model
            .set_data(project, CellData::Value(Value::from("Gemini")))
            .unwrap();
        assert!(model.is_consistent());
        assert!(!model.entry(project).unwrap().state.required_not_set);
    }

    #[test]
    fn system_values_cannot_be_cleared() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let owner = row(&model, OWNER_ID);
        assert!(!model.is_clearable(owner));
        assert!(!model.is_editable(owner, Column::Value));
        assert!(model.clear_value(owner).is_err());
    }

    #[test]
    fn save_without_changes_calls_nothing() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        model.save().unwrap();
        assert_eq!(gw.update_count(), 0);
    }

    #[test]
    fn save_issues_one_update() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let project = row(&model, "project");
        model
            .set_data(project, CellData::Value(Value::from("Gemini")))
            .unwrap();
        model.remove(row(&model, "note")).unwrap();
        let added = model.add().unwrap();
        model.set_data(added, CellData::Name("size".into())).unwrap();
        model.set_data(added, CellData::Value(Value::from(7))).unwrap();
        assert!(model.is_consistent());

        model.save().unwrap();
        assert_eq!(gw.update_count(), 1);
        let (item, upserts, deletes) = gw.updates.borrow()[0].clone();
        assert_eq!(item, "/item");
        let ids: Vec<_> = upserts.iter().map(|p| p.identifier().to_string()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"project".to_string()));
        assert!(ids.contains(&"size".to_string()));
        assert_eq!(deletes, vec!["note".to_string()]);

        assert!(!model.is_dirty());
        assert_eq!(model.row_count(), 3);
        assert!(model.find("note").is_none());
        let size = model.entry(row(&model, "size")).unwrap();
        assert_eq!(size.category, Some(RowCategory::Custom));
        assert!(size.definition.is_some());
        assert_eq!(size.original_value, Value::from(7));
    }

    #[test]
    fn failed_save_keeps_state() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        model.remove(note).unwrap();
        gw.fail_updates.set(true);

        assert!(matches!(model.save(), Err(ModelError::Persistence(_))));
        assert!(model.entry(note).unwrap().state.deleted);
        assert!(model.is_dirty());

        gw.fail_updates.set(false);
        model.save().unwrap();
        assert!(!model.is_dirty());
    }

    #[test]
    fn save_requires_item() {
        let gw = MockGateway::new();
        let mut model = PropertiesModel::new(&gw);
        model.load(vec![gw.property("note", "x")]);
        model.set_data(0, CellData::Value(Value::from("y"))).unwrap();
        assert!(matches!(
            model.save(),
            Err(ModelError::InvalidOperation(_))
        ));
    }

    #[test]
    fn sort_ignores_case_and_survives_refresh() {
        let gw = MockGateway::new();
        let stored = vec![
            gw.property("beta", "x"),
            gw.property("Alpha", "y"),
            gw.property("project", "z"),
        ];
        let gw = gw.with_stored(stored);
        let mut model = loaded(&gw);
        let names = |m: &PropertiesModel<'_, MockGateway>| {
            m.entries().iter().map(|e| e.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&model), vec!["Alpha", "beta", "Project"]);

        model.sort(Column::Name, false);
        assert_eq!(names(&model), vec!["Project", "beta", "Alpha"]);
        model.refresh().unwrap();
        assert_eq!(names(&model), vec!["Project", "beta", "Alpha"]);
        assert_eq!(model.sort_order(), (Column::Name, false));
    }

    #[test]
    fn property_name_checks() {
        let gw = standard_gateway();
        let model = loaded(&gw);
        assert!(!model.is_property_name_unique("note"));
        assert!(!model.is_valid_property_name("note"));
        assert!(!model.is_valid_property_name("____x____"));
        assert!(model.is_valid_property_name("remark"));
        assert!(model.has_custom_metadata_support());
    }

    #[test]
    fn read_only_items_reject_changes() {
        let mut gw = standard_gateway();
        gw.writable = false;
        let mut model = loaded(&gw);
        assert!(model.is_read_only());
        assert!(model.add().is_err());
        let note = row(&model, "note");
        assert!(!model.is_editable(note, Column::Value));
        assert!(model.remove(note).is_err());
        assert!(!model.is_clearable(note));
        assert!(!model.is_deletable(note));
        assert!(model.clear_value(note).is_err());
    }

    #[test]
    fn deleted_rows_are_not_clearable() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        assert!(model.is_clearable(note));
        model.remove(note).unwrap();
        assert!(!model.is_clearable(note));
        assert!(model.clear_value(note).is_err());
    }

    #[test]
    fn switching_between_bool_and_number_is_an_edit() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        let note = row(&model, "note");
        assert!(model.set_data(note, CellData::Value(Value::from(1))).unwrap());
        model.save().unwrap();
        assert!(!model.is_dirty());

        assert!(model.set_data(note, CellData::Value(Value::from(true))).unwrap());
        assert!(model.entry(note).unwrap().state.edited);
        assert_eq!(model.entry(note).unwrap().value.kind(), ValueKind::Bool);
    }

    #[test]
    fn out_of_range_rows() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        assert!(matches!(
            model.set_data(9, CellData::Value(Value::None)),
            Err(ModelError::RowOutOfRange(9))
        ));
        assert!(!model.is_deletable(9));
        assert!(model.entry(9).is_none());
    }

    #[test]
    fn clear_resets_model() {
        let gw = standard_gateway();
        let mut model = loaded(&gw);
        model.clear();
        assert_eq!(model.row_count(), 0);
        assert!(model.item().is_none());
        model.refresh().unwrap();
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn properties_materialize_rows() {
        let gw = standard_gateway();
        let model = loaded(&gw);
        let properties = model.properties().unwrap();
        assert_eq!(properties.len(), 3);
    }
}
