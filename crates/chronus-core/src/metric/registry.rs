//! Registry of metric instances, built from a closed list of definitions.

use std::collections::HashMap;

use crate::error::{ChronusError, Result};

use super::definition::MetricDef;
use super::instance::MetricInstance;
use super::render::{self, Exposition};

/// Owns one [`MetricInstance`] per definition for the duration of a pass.
///
/// Instances keep definition order, so rendering is stable across passes.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    instances: Vec<MetricInstance>,
    index: HashMap<&'static str, usize>,
    common: Vec<(String, String)>,
}

impl MetricRegistry {
    /// Build a registry from `defs`, binding `common` label values to every
    /// instance.
    ///
    /// Fails on duplicate names, malformed names, or a common label without
    /// a value. Nothing is collected before this succeeds.
    pub fn new<I, K, V>(defs: &[MetricDef], common: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let common: Vec<(String, String)> = common
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut instances = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            def.validate()?;
            if index.insert(def.name, instances.len()).is_some() {
                return Err(ChronusError::DuplicateDefinition(def.name.to_string()));
            }
            instances.push(MetricInstance::new(*def, &common)?);
        }

        Ok(Self {
            instances,
            index,
            common,
        })
    }

    /// Instance for `name`.
    pub fn instance_for(&mut self, name: &str) -> Result<&mut MetricInstance> {
        let pos = *self
            .index
            .get(name)
            .ok_or_else(|| ChronusError::UnknownMetric(name.to_string()))?;
        Ok(&mut self.instances[pos])
    }

    pub fn get(&self, name: &str) -> Option<&MetricInstance> {
        self.index.get(name).map(|&pos| &self.instances[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn instances(&self) -> impl Iterator<Item = &MetricInstance> {
        self.instances.iter()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &MetricDef> {
        self.instances.iter().map(|i| i.def())
    }

    pub fn common_labels(&self) -> &[(String, String)] {
        &self.common
    }

    /// Total committed records across all instances.
    pub fn record_count(&self) -> usize {
        self.instances.iter().map(MetricInstance::len).sum()
    }

    /// Empty registry with the same schema and common labels.
    pub fn fresh(&self) -> Self {
        let instances = self
            .instances
            .iter()
            .map(|i| {
                let mut blank = i.clone();
                blank.clear();
                blank
            })
            .collect();
        Self {
            instances,
            index: self.index.clone(),
            common: self.common.clone(),
        }
    }

    /// Empty staging registry restricted to `names`.
    ///
    /// Used to give a probe stage its own write area; writes to any metric
    /// outside `names` fail with `UnknownMetric`.
    pub fn scoped(&self, names: &[&str]) -> Result<Self> {
        let mut defs = Vec::with_capacity(names.len());
        for name in names {
            let inst = self
                .get(name)
                .ok_or_else(|| ChronusError::UnknownMetric(name.to_string()))?;
            defs.push(*inst.def());
        }
        Self::new(&defs, self.common.iter().cloned())
    }

    /// Fold a staging registry's records into this one.
    ///
    /// Record order within each metric is preserved; repeated label sets
    /// follow the per-kind merge rules.
    pub fn merge(&mut self, staging: MetricRegistry) -> Result<()> {
        for inst in staging.instances {
            if inst.is_empty() {
                continue;
            }
            self.instance_for(inst.name())?.absorb(inst);
        }
        Ok(())
    }

    /// Render every non-empty instance in exposition format.
    pub fn render(&self) -> Exposition {
        render::render_many(&[self])
    }

    /// Render several registries (e.g. a host and its guests) as one body.
    pub fn render_all(registries: &[&MetricRegistry]) -> Exposition {
        render::render_many(registries)
    }
}
