use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EngineError;
use crate::traits::MethodHandler;
use warden_types::MethodDescription;

/// A restricted method as registered: what it does and who implements it.
#[derive(Clone)]
pub struct RestrictedMethod {
    pub description: String,
    pub handler: Arc<dyn MethodHandler>,
}

/// The authoritative set of methods this engine governs. Frozen after
/// construction; lookup is by exact method name.
pub struct MethodRegistry {
    methods: HashMap<String, RestrictedMethod>,
}

impl MethodRegistry {
    pub(crate) fn new(
        entries: Vec<(String, RestrictedMethod)>,
    ) -> Result<Self, EngineError> {
        let mut methods = HashMap::with_capacity(entries.len());
        for (name, method) in entries {
            if methods.insert(name.clone(), method).is_some() {
                return Err(EngineError::DuplicateRestrictedMethod(name));
            }
        }
        Ok(Self { methods })
    }

    pub fn get(&self, method: &str) -> Option<&RestrictedMethod> {
        self.methods.get(method)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Description records for the engine state, in stable (sorted) order.
    pub fn descriptions(&self) -> Vec<MethodDescription> {
        let mut descriptions: Vec<MethodDescription> = self
            .methods
            .iter()
            .map(|(method, entry)| MethodDescription {
                method: method.clone(),
                description: entry.description.clone(),
            })
            .collect();
        descriptions.sort_by(|a, b| a.method.cmp(&b.method));
        descriptions
    }
}
