//! Per-definition label cursor.
//!
//! A `LabelBinding` collects one candidate label assignment at a time. Common
//! labels are bound once at construction and survive resets; every other
//! label must be set again before each commit.

use crate::error::{ChronusError, Result};

use super::definition::MetricDef;

#[derive(Debug, Clone)]
pub struct LabelBinding {
    def: MetricDef,
    /// Aligned with `def.label_names()`.
    slots: Vec<Option<String>>,
    /// Slot contents restored after every commit attempt.
    defaults: Vec<Option<String>>,
    /// Names passed to `set` that the definition does not declare.
    unknown: Vec<String>,
}

impl LabelBinding {
    /// Build a cursor with `common` pre-bound. Every common label declared by
    /// `def` must have a non-empty value.
    pub fn new(def: MetricDef, common: &[(String, String)]) -> Result<Self> {
        let mut defaults = vec![None; def.label_count()];
        for (i, name) in def.label_names().enumerate().skip(def.labels.len()) {
            let value = common
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ChronusError::MissingCommonLabel {
                    metric: def.name.to_string(),
                    label: name.to_string(),
                })?;
            defaults[i] = Some(value.clone());
        }

        Ok(Self {
            def,
            slots: defaults.clone(),
            defaults,
            unknown: Vec::new(),
        })
    }

    pub fn def(&self) -> &MetricDef {
        &self.def
    }

    /// Assign `value` to `name`. Later assignments to the same name win.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        match self.def.label_names().position(|l| l == name) {
            Some(i) => self.slots[i] = Some(value.into()),
            None => self.unknown.push(name.to_string()),
        }
        self
    }

    /// Current value for `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        let i = self.def.label_names().position(|l| l == name)?;
        self.slots[i].as_deref()
    }

    /// Label names still lacking a non-empty value.
    pub fn missing(&self) -> Vec<String> {
        self.def
            .label_names()
            .zip(self.slots.iter())
            .filter(|(_, v)| v.as_deref().map_or(true, str::is_empty))
            .map(|(k, _)| k.to_string())
            .collect()
    }

    /// Take the current assignment in declared order and reset the cursor.
    ///
    /// The cursor is reset whether or not the assignment was complete.
    pub fn freeze(&mut self) -> Result<Vec<(&'static str, String)>> {
        let unknown = std::mem::take(&mut self.unknown);
        let missing = self.missing();
        let slots = std::mem::replace(&mut self.slots, self.defaults.clone());

        if let Some(label) = unknown.into_iter().next() {
            return Err(ChronusError::UnknownLabel {
                metric: self.def.name.to_string(),
                label,
            });
        }
        if !missing.is_empty() {
            return Err(ChronusError::IncompleteLabels {
                metric: self.def.name.to_string(),
                missing,
            });
        }

        Ok(self
            .def
            .label_names()
            .zip(slots)
            .map(|(k, v)| (k, v.unwrap_or_default()))
            .collect())
    }

    /// Drop any partial assignment.
    pub fn reset(&mut self) {
        self.slots = self.defaults.clone();
        self.unknown.clear();
    }
}
