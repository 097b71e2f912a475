// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::components::{FileLineSource, JsonContentAggregator, LogEmitter};
use crate::config::ComponentConfiguration;
use crate::errors::ConfigurationError;
use crate::traits::Component;

type ComponentFactory = Arc<dyn Fn() -> Component + Send + Sync>;

/// Maps a component's (name, version) onto a factory producing fresh instances.
///
/// Populated once at startup; assembly only ever looks components up here.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: HashMap<(String, String), ComponentFactory>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.components())
            .finish()
    }
}

fn registry_key(name: &str, version: &str) -> (String, String) {
    (name.trim().to_string(), version.trim().to_string())
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every component shipped with the node
    pub fn with_builtin_components() -> Self {
        let mut registry = Self::new();
        registry.register(JsonContentAggregator::NAME, JsonContentAggregator::VERSION, || {
            Component::DelayedResponse(Box::new(JsonContentAggregator::new()))
        });
        registry.register(FileLineSource::NAME, FileLineSource::VERSION, || {
            Component::Source(Box::new(FileLineSource::new()))
        });
        registry.register(LogEmitter::NAME, LogEmitter::VERSION, || {
            Component::Emitter(Box::new(LogEmitter::new()))
        });
        registry
    }

    /// Register a factory; a later registration under the same key replaces the earlier one.
    pub fn register<F>(&mut self, name: &str, version: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Component + Send + Sync + 'static,
    {
        self.factories.insert(registry_key(name, version), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.factories.contains_key(&registry_key(name, version))
    }

    /// Registered (name, version) pairs, sorted
    pub fn components(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Create and initialize the component described by `config`.
    ///
    /// The declared component type must match the kind of component the
    /// factory produces.
    pub fn instantiate(&self, config: &ComponentConfiguration) -> Result<Component, ConfigurationError> {
        let factory = self
            .factories
            .get(&registry_key(&config.name, &config.version))
            .ok_or_else(|| ConfigurationError::UnknownComponent {
                name: config.name.clone(),
                version: config.version.clone(),
            })?;

        let mut component = factory();
        if let Some(declared) = config.kind() {
            let actual = component.component_type();
            if !declared.is_compatible_with(actual) {
                return Err(ConfigurationError::ComponentTypeMismatch {
                    component_id: config.id.clone(),
                    name: config.name.clone(),
                    declared,
                    actual,
                });
            }
        }

        component.initialize(config.id.trim(), &config.settings)?;
        Ok(component)
    }
}
