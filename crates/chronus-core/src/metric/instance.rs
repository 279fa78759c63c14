use std::collections::{BTreeMap, HashMap};

use crate::error::{ChronusError, Result};

use super::binding::LabelBinding;
use super::definition::{is_valid_name, MetricDef, MetricKind};

/// Value carried by one committed sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Number(f64),
    /// Informational payload, rendered as extra labels with value 1.
    Info(BTreeMap<String, String>),
}

impl SampleValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SampleValue::Number(v) => Some(*v),
            SampleValue::Info(_) => None,
        }
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(impl From<$t> for SampleValue {
            fn from(v: $t) -> Self {
                SampleValue::Number(v as f64)
            }
        })*
    };
}

number_from!(f64, f32, u64, u32, i64, i32, usize);

impl From<BTreeMap<String, String>> for SampleValue {
    fn from(v: BTreeMap<String, String>) -> Self {
        SampleValue::Info(v)
    }
}

/// One fully labeled sample. Immutable once committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRecord {
    labels: Vec<(&'static str, String)>,
    value: SampleValue,
}

impl ValueRecord {
    /// Labels in declared order (own labels, then common labels).
    pub fn labels(&self) -> &[(&'static str, String)] {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn value(&self) -> &SampleValue {
        &self.value
    }

    fn key(&self) -> Vec<String> {
        self.labels.iter().map(|(_, v)| v.clone()).collect()
    }
}

/// Ordered record set for one definition, plus its label cursor.
///
/// Records keep commit order. A commit whose label set matches an existing
/// record does not add a new series: counters are summed into it, gauges and
/// info payloads replace it in place.
#[derive(Debug, Clone)]
pub struct MetricInstance {
    def: MetricDef,
    binding: LabelBinding,
    records: Vec<ValueRecord>,
    index: HashMap<Vec<String>, usize>,
}

impl MetricInstance {
    pub fn new(def: MetricDef, common: &[(String, String)]) -> Result<Self> {
        Ok(Self {
            def,
            binding: LabelBinding::new(def, common)?,
            records: Vec::new(),
            index: HashMap::new(),
        })
    }

    pub fn def(&self) -> &MetricDef {
        &self.def
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn binding(&self) -> &LabelBinding {
        &self.binding
    }

    /// Fluent label assignment for the next commit.
    pub fn set_label(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.binding.set(name, value.to_string());
        self
    }

    /// Finalize the current label assignment with `value`.
    ///
    /// Fails without touching the record set when a label is unset, unknown,
    /// or the value does not fit the metric kind. The cursor is reset either way.
    pub fn commit(&mut self, value: impl Into<SampleValue>) -> Result<&ValueRecord> {
        let labels = self.binding.freeze()?;
        let value = value.into();
        self.check_value(&labels, &value)?;
        Ok(self.push(ValueRecord { labels, value }))
    }

    /// Shorthand for metrics without own labels.
    pub fn value(&mut self, value: impl Into<SampleValue>) -> Result<&ValueRecord> {
        self.commit(value)
    }

    pub fn records(&self) -> &[ValueRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Drop all records and any partial label assignment.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
        self.binding.reset();
    }

    /// Move every record of `other` into this instance, in order.
    pub(crate) fn absorb(&mut self, other: MetricInstance) {
        for record in other.records {
            self.push(record);
        }
    }

    fn check_value(&self, labels: &[(&'static str, String)], value: &SampleValue) -> Result<()> {
        let mismatch = || ChronusError::KindMismatch {
            metric: self.def.name.to_string(),
            kind: self.def.kind.as_str(),
        };
        match (self.def.kind, value) {
            (MetricKind::Gauge, SampleValue::Number(_)) => Ok(()),
            (MetricKind::Counter, SampleValue::Number(v)) if *v >= 0.0 => Ok(()),
            (MetricKind::Info, SampleValue::Info(payload)) => {
                for key in payload.keys() {
                    if !is_valid_name(key) || labels.iter().any(|(l, _)| l == key) {
                        return Err(ChronusError::InvalidName(format!(
                            "{}.{}",
                            self.def.name, key
                        )));
                    }
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }

    fn push(&mut self, record: ValueRecord) -> &ValueRecord {
        let key = record.key();
        match self.index.get(&key).copied() {
            Some(pos) => {
                let slot = &mut self.records[pos];
                match (self.def.kind, &mut slot.value, record.value) {
                    (MetricKind::Counter, SampleValue::Number(total), SampleValue::Number(v)) => {
                        *total += v
                    }
                    (_, current, value) => *current = value,
                }
                &self.records[pos]
            }
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
                &self.records[self.records.len() - 1]
            }
        }
    }
}
