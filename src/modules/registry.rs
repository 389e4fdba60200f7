// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::modules::builtin::*;
use crate::traits::{BlockRole, FlowModule};

/// Creates a fresh module instance.
pub type ModuleConstructor = Box<dyn Fn() -> Box<dyn FlowModule>>;

/// Table of module constructors by upper-case name.
///
/// Every `$NAME` of a flow gets its own instance, so module state is never shared between
/// two occurrences of the same module.
pub struct ModuleRegistry {
    constructors: BTreeMap<String, ModuleConstructor>,
}

impl ModuleRegistry {
    /// A registry without any module, not even the structural keywords.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in module.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        // Structural keywords
        registry.register("IF", || Box::new(Conditional::new(false)));
        registry.register("ELSEIF", || Box::new(Conditional::new(true)));
        registry.register("ELSE", || Box::new(Marker::new(BlockRole::Else)));
        registry.register("ENDIF", || Box::new(Marker::new(BlockRole::EndIf)));
        registry.register("SPLIT", || Box::new(Marker::new(BlockRole::Split)));
        registry.register("ENDSPLIT", || Box::new(Marker::new(BlockRole::EndSplit)));

        // Input
        registry.register("SYNTHETIC", || Box::new(Synthetic::default()));

        // Single-trace processing
        registry.register("SCALE", || Box::new(Scale::default()));
        registry.register("SELECT", || Box::new(Select::default()));
        registry.register("HDR_SET", || Box::new(HeaderSet::default()));
        registry.register("HDR_DEL", || Box::new(HeaderDelete::default()));
        registry.register("HDR_TABLE", || Box::new(HeaderTable::default()));
        registry.register("HDR_PRINT", || Box::new(HeaderPrint::default()));
        registry.register("RESIZE", || Box::new(Resize::default()));
        registry.register("ENS", || Box::new(EnsembleKeys::default()));

        // Multi-trace processing
        registry.register("SUM", || Box::new(Sum::default()));
        registry.register("STACK", || Box::new(Stack::default()));

        registry
    }

    /// Add or replace a module.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Box<dyn FlowModule> + 'static,
    {
        self.constructors
            .insert(name.to_ascii_uppercase(), Box::new(constructor));
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn FlowModule>> {
        self.constructors
            .get(&name.to_ascii_uppercase())
            .map(|constructor| constructor())
    }

    /// Names of every registered module, sorted.
    pub fn list_available_modules(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn is_module_available(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_ascii_uppercase())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
