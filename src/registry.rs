//! Name-to-implementation tables for formats, stylings and transformers.
//!
//! Registration happens on a [`RegistryBuilder`]. Freezing it yields
//! [`Registries`], which only offers lookups, so nothing can be registered
//! once conversion has started. Registration order is kept: it is the
//! priority order of styling detection.
//!
//! A process-wide instance is available through [`global`]. Custom
//! components are added by building a registry and passing it to
//! [`install`] before the first lookup.

use crate::error::{ComponentKind, Error, Result};
use crate::format::{CsvFormat, Format, FormatKind, JsonFormat, JsonlFormat, YamlFormat};
use crate::styling::{self, Styling};
use crate::transform::{ContextPromptFactory, TransformerFactory};
use once_cell::sync::OnceCell;
use std::fmt;

static GLOBAL: OnceCell<Registries> = OnceCell::new();

struct Table<T: ?Sized> {
    kind: ComponentKind,
    entries: Vec<(String, Box<T>)>,
}

impl<T: ?Sized> Table<T> {
    const fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, name: &str, item: Box<T>) -> Result<()> {
        if self.contains(name) {
            return Err(Error::duplicate(self.kind, name));
        }
        self.entries.push((name.to_string(), item));
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    fn get(&self, name: &str) -> Result<&T> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, item)| &**item)
            .ok_or_else(|| Error::unknown_component(self.kind, name))
    }

    fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, item)| &**item)
    }
}

/// Collects registrations before the registries are frozen.
pub struct RegistryBuilder {
    formats: Table<dyn Format>,
    stylings: Table<dyn Styling>,
    transformers: Table<dyn TransformerFactory>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("formats", &self.formats.names())
            .field("stylings", &self.stylings.names())
            .field("transformers", &self.transformers.names())
            .finish()
    }
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            formats: Table::new(ComponentKind::Parser),
            stylings: Table::new(ComponentKind::Styling),
            transformers: Table::new(ComponentKind::Transformer),
        }
    }

    /// Creates a builder holding the four formats, the five stylings in
    /// detection priority order and the `context_prompt` transformer.
    #[must_use]
    pub fn builtin() -> Self {
        let mut builder = Self::new();

        let formats: Vec<Box<dyn Format>> = vec![
            Box::new(CsvFormat),
            Box::new(JsonFormat),
            Box::new(JsonlFormat),
            Box::new(YamlFormat),
        ];
        for format in formats {
            builder
                .formats
                .entries
                .push((format.kind().as_str().to_string(), format));
        }

        for styling in styling::builtin() {
            builder
                .stylings
                .entries
                .push((styling.name().to_string(), styling));
        }

        builder
            .transformers
            .entries
            .push((ContextPromptFactory.name().to_string(), Box::new(ContextPromptFactory)));

        builder
    }

    /// Registers a format parser/writer under its kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if the kind is taken.
    pub fn register_format(&mut self, format: impl Format + 'static) -> Result<&mut Self> {
        let name = format.kind().as_str();
        self.formats.insert(name, Box::new(format))?;
        Ok(self)
    }

    /// Registers a styling. Later registrations have lower detection
    /// priority.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if the name is taken.
    pub fn register_styling(&mut self, styling: impl Styling + 'static) -> Result<&mut Self> {
        let name = styling.name().to_string();
        self.stylings.insert(&name, Box::new(styling))?;
        Ok(self)
    }

    /// Registers a transformer factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if the name is taken.
    pub fn register_transformer(
        &mut self,
        factory: impl TransformerFactory + 'static,
    ) -> Result<&mut Self> {
        let name = factory.name().to_string();
        self.transformers.insert(&name, Box::new(factory))?;
        Ok(self)
    }

    /// Ends the registration phase.
    #[must_use]
    pub fn freeze(self) -> Registries {
        Registries {
            formats: self.formats,
            stylings: self.stylings,
            transformers: self.transformers,
        }
    }
}

/// Frozen, lookup-only registries.
pub struct Registries {
    formats: Table<dyn Format>,
    stylings: Table<dyn Styling>,
    transformers: Table<dyn TransformerFactory>,
}

impl fmt::Debug for Registries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registries")
            .field("formats", &self.format_names())
            .field("stylings", &self.styling_names())
            .field("transformers", &self.transformer_names())
            .finish()
    }
}

impl Registries {
    /// Looks up the parser/writer of a format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] if the format is not registered.
    pub fn format(&self, kind: FormatKind) -> Result<&dyn Format> {
        self.formats.get(kind.as_str())
    }

    /// Looks up a styling by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] if the styling is not registered.
    pub fn styling(&self, name: &str) -> Result<&dyn Styling> {
        self.stylings.get(name)
    }

    /// Looks up a transformer factory by type name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] if the type is not registered.
    pub fn transformer(&self, name: &str) -> Result<&dyn TransformerFactory> {
        self.transformers.get(name)
    }

    /// Stylings in detection priority order.
    pub fn stylings(&self) -> impl Iterator<Item = &dyn Styling> {
        self.stylings.iter()
    }

    /// Registered format names.
    #[must_use]
    pub fn format_names(&self) -> Vec<&str> {
        self.formats.names()
    }

    /// Registered styling names in priority order.
    #[must_use]
    pub fn styling_names(&self) -> Vec<&str> {
        self.stylings.names()
    }

    /// Registered transformer type names.
    #[must_use]
    pub fn transformer_names(&self) -> Vec<&str> {
        self.transformers.names()
    }
}

/// Installs `builder` as the process-wide registries.
///
/// # Errors
///
/// Returns [`Error::RegistryFrozen`] if the global registries already exist,
/// either from an earlier install or from a call to [`global`].
pub fn install(builder: RegistryBuilder) -> Result<&'static Registries> {
    GLOBAL
        .try_insert(builder.freeze())
        .map_err(|_| Error::RegistryFrozen)
}

/// Returns the process-wide registries, freezing the built-ins on first use.
pub fn global() -> &'static Registries {
    GLOBAL.get_or_init(|| RegistryBuilder::builtin().freeze())
}
