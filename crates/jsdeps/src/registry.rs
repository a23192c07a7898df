//! Symbol registry
//!
//! Maps every provided symbol to the file that declares it. A symbol can be
//! claimed by exactly one file per resolution session.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the symbol registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two distinct files provide the same symbol
    #[error("Symbol '{symbol}' provided by {} is already defined in {}", .filename.display(), .first_defined.display())]
    Conflict {
        symbol: String,
        filename: PathBuf,
        first_defined: PathBuf,
    },
}

/// Registry of provided symbols (symbol name → declaring file)
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    symbols: IndexMap<String, PathBuf>,
}

impl SymbolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol for a file
    ///
    /// Registering the same symbol again for the same file is a no-op.
    ///
    /// # Returns
    /// * `Ok(())` - Symbol registered
    /// * `Err(RegistryError::Conflict)` - Symbol already claimed by another file
    pub fn add(&mut self, symbol: &str, filename: &Path) -> Result<(), RegistryError> {
        self.check(symbol, filename)?;
        self.symbols
            .entry(symbol.to_string())
            .or_insert_with(|| filename.to_path_buf());
        Ok(())
    }

    /// Register every symbol of one file, or none of them
    pub fn add_all(&mut self, symbols: &[String], filename: &Path) -> Result<(), RegistryError> {
        for symbol in symbols {
            self.check(symbol, filename)?;
        }
        for symbol in symbols {
            self.add(symbol, filename)?;
        }
        Ok(())
    }

    fn check(&self, symbol: &str, filename: &Path) -> Result<(), RegistryError> {
        match self.symbols.get(symbol) {
            Some(existing) if existing != filename => Err(RegistryError::Conflict {
                symbol: symbol.to_string(),
                filename: filename.to_path_buf(),
                first_defined: existing.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Check if a symbol is registered
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    /// Get the file that declares a symbol
    pub fn lookup_filename(&self, symbol: &str) -> Option<&Path> {
        self.symbols.get(symbol).map(PathBuf::as_path)
    }

    /// Remove a symbol binding, returning the file it pointed to
    pub fn remove(&mut self, symbol: &str) -> Option<PathBuf> {
        self.symbols.shift_remove(symbol)
    }

    /// Drop all bindings
    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    /// Iterate bindings in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.symbols
            .iter()
            .map(|(symbol, path)| (symbol.as_str(), path.as_path()))
    }

    /// Get the number of registered symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
