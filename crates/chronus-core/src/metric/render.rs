//! Prometheus text exposition (format 0.0.4).
//!
//! Each non-empty metric gets one `# HELP` and one `# TYPE` line followed by
//! one sample line per record. Labels are written in declared order, never
//! sorted, so output diffs cleanly between scrapes.

use std::fmt::{self, Write};

use super::instance::{MetricInstance, SampleValue};
use super::registry::MetricRegistry;

/// Rendered body plus the diagnostics gathered while rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exposition {
    pub text: String,
    /// Metrics skipped because no probe committed a sample for them.
    pub skipped: Vec<&'static str>,
    /// Number of sample lines written.
    pub samples: usize,
}

impl Exposition {
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

impl fmt::Display for Exposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Integral values print without a fraction so byte counts stay exact.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf".into() } else { "-Inf".into() }
    } else if v == 0.0 {
        // also catches -0.0
        "0".into()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

/// Render several registries as one body.
///
/// Metrics are emitted in first-seen definition order; a metric present in
/// more than one registry gets a single preamble followed by the samples of
/// each registry in turn.
pub fn render_many(registries: &[&MetricRegistry]) -> Exposition {
    let mut names: Vec<&'static str> = Vec::new();
    for reg in registries {
        for def in reg.definitions() {
            if !names.contains(&def.name) {
                names.push(def.name);
            }
        }
    }

    let mut out = Exposition::default();
    for name in names {
        let instances: Vec<&MetricInstance> = registries
            .iter()
            .filter_map(|r| r.get(name))
            .filter(|i| !i.is_empty())
            .collect();
        let Some(first) = instances.first() else {
            tracing::warn!(metric = %name, "metric not set, skip");
            out.skipped.push(name);
            continue;
        };

        let def = first.def();
        let _ = writeln!(out.text, "# HELP {} {}", def.name, escape_help(def.help));
        let _ = writeln!(out.text, "# TYPE {} {}", def.name, def.kind.exposition_type());
        for inst in instances {
            out.samples += render_samples(inst, &mut out.text);
        }
    }
    out
}

fn render_samples(inst: &MetricInstance, out: &mut String) -> usize {
    let name = inst.name();
    for record in inst.records() {
        let mut pairs: Vec<String> = record
            .labels()
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect();

        let value = match record.value() {
            SampleValue::Number(v) => format_value(*v),
            SampleValue::Info(payload) => {
                pairs.extend(
                    payload
                        .iter()
                        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v))),
                );
                "1".to_string()
            }
        };

        if pairs.is_empty() {
            let _ = writeln!(out, "{} {}", name, value);
        } else {
            let _ = writeln!(out, "{}{{{}}} {}", name, pairs.join(","), value);
        }
    }
    inst.len()
}
