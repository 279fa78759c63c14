//! Exposition rendering.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeMap;

use chronus_core::metric::catalog::{self, HOST_METRICS};
use chronus_core::metric::render::format_value;
use chronus_core::{MetricDef, MetricRegistry};

fn sample_lines<'a>(text: &'a str, name: &str) -> Vec<&'a str> {
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .filter(|l| l.split(['{', ' ']).next() == Some(name))
        .collect()
}

#[test]
fn counter_scenario() {
    let mut reg = MetricRegistry::new(&[catalog::CPU_TIME], [("host", "h1")]).unwrap();
    let inst = reg.instance_for("cpu_time").unwrap();
    inst.set_label("mode", "user").commit(10u64).unwrap();
    inst.set_label("mode", "idle").commit(5u64).unwrap();

    let out = reg.render();
    assert!(out.text.contains("cpu_time{mode=\"user\",host=\"h1\"} 10\n"));
    assert!(out.text.contains("cpu_time{mode=\"idle\",host=\"h1\"} 5\n"));
    assert!(out.text.contains("# TYPE cpu_time counter\n"));
    assert_eq!(out.samples, 2);
}

#[test]
fn gauge_scenario() {
    let mut reg = MetricRegistry::new(&[catalog::MEMORY_TOTAL_BYTES], [("host", "h1")]).unwrap();
    let inst = reg.instance_for("memory_total_bytes").unwrap();
    inst.set_label("type", "physical").commit(33554432u64).unwrap();
    inst.set_label("type", "swap").commit(2147483648u64).unwrap();

    let text = reg.render().text;
    assert_eq!(
        sample_lines(&text, "memory_total_bytes"),
        [
            "memory_total_bytes{type=\"physical\",host=\"h1\"} 33554432",
            "memory_total_bytes{type=\"swap\",host=\"h1\"} 2147483648",
        ]
    );
    assert!(text.contains("# TYPE memory_total_bytes gauge\n"));
}

#[test]
fn empty_metrics_are_skipped_not_fatal() {
    let mut reg = MetricRegistry::new(HOST_METRICS, [("host", "h1")]).unwrap();
    reg.instance_for("cpu_num").unwrap().value(4u32).unwrap();

    let out = reg.render();
    assert_eq!(out.samples, 1);
    assert_eq!(out.skipped.len(), HOST_METRICS.len() - 1);
    assert!(out.skipped.contains(&"cpu_time"));
    assert!(!out.text.contains("cpu_time"));
    assert!(out.text.contains("cpu_num{host=\"h1\"} 4\n"));
}

#[test]
fn lines_follow_commit_order() {
    let mut reg = MetricRegistry::new(&[catalog::NETWORK_TRAFFICS], [("host", "h1")]).unwrap();
    let inst = reg.instance_for("network_traffics").unwrap();
    let commits = [("eth1", "sent", 7u64), ("eth0", "recv", 3), ("lo", "sent", 0)];
    for (dev, ty, v) in commits {
        inst.set_label("device", dev)
            .set_label("type", ty)
            .set_label("name", "bytes")
            .commit(v)
            .unwrap();
    }

    let text = reg.render().text;
    let lines = sample_lines(&text, "network_traffics");
    assert_eq!(lines.len(), commits.len());
    for (line, (dev, ty, v)) in lines.iter().zip(commits) {
        assert_eq!(
            *line,
            format!("network_traffics{{device=\"{dev}\",type=\"{ty}\",name=\"bytes\",host=\"h1\"}} {v}")
        );
    }
}

#[test]
fn help_precedes_type_once_per_metric() {
    let mut reg = MetricRegistry::new(&[catalog::CPU_TIME], [("host", "h1")]).unwrap();
    let inst = reg.instance_for("cpu_time").unwrap();
    inst.set_label("mode", "user").commit(1u64).unwrap();
    inst.set_label("mode", "system").commit(1u64).unwrap();

    let text = reg.render().text;
    let preamble: Vec<&str> = text.lines().filter(|l| l.starts_with('#')).collect();
    assert_eq!(preamble.len(), 2);
    assert!(preamble[0].starts_with("# HELP cpu_time "));
    assert_eq!(preamble[1], "# TYPE cpu_time counter");
}

#[test]
fn info_renders_payload_with_value_one() {
    let def = MetricDef::info("build", "build info").with_labels(&["component"]);
    let mut reg = MetricRegistry::new(&[def], [("host", "h1")]).unwrap();
    let mut payload = BTreeMap::new();
    payload.insert("version".to_string(), "0.1.0".to_string());
    reg.instance_for("build")
        .unwrap()
        .set_label("component", "core")
        .commit(payload)
        .unwrap();

    let text = reg.render().text;
    assert!(text.contains("# TYPE build gauge\n"));
    assert!(text.contains("build{component=\"core\",host=\"h1\",version=\"0.1.0\"} 1\n"));
}

#[test]
fn label_values_are_escaped() {
    let mut reg = MetricRegistry::new(&[catalog::DISK_FREE_SPACE_BYTES], [("host", "h1")]).unwrap();
    reg.instance_for("disk_free_space_bytes")
        .unwrap()
        .set_label("device", "C:\\")
        .set_label("name", "say \"hi\"")
        .commit(1u64)
        .unwrap();
    let text = reg.render().text;
    assert!(text.contains(r#"device="C:\\",name="say \"hi\"""#));
}

#[test]
fn value_formatting() {
    assert_eq!(format_value(10.0), "10");
    assert_eq!(format_value(2147483648.0), "2147483648");
    assert_eq!(format_value(12.5), "12.5");
    assert_eq!(format_value(f64::INFINITY), "+Inf");
    assert_eq!(format_value(f64::NAN), "NaN");
    assert_eq!(format_value(0.0), "0");
    assert_eq!(format_value(-0.0), "0");
}

#[test]
fn several_registries_share_one_preamble() {
    let mut host = MetricRegistry::new(HOST_METRICS, [("host", "kvm1")]).unwrap();
    host.instance_for("cpu_num").unwrap().value(16u32).unwrap();

    let mut guest =
        MetricRegistry::new(&[catalog::DOMAIN_ALIVE, catalog::CPU_NUM], [("host", "web")]).unwrap();
    guest.instance_for("cpu_num").unwrap().value(4u32).unwrap();
    guest
        .instance_for("domain_alive")
        .unwrap()
        .set_label("hypervisor", "kvm1")
        .commit(1u32)
        .unwrap();

    let out = MetricRegistry::render_all(&[&host, &guest]);
    assert_eq!(out.text.matches("# TYPE cpu_num gauge\n").count(), 1);
    assert_eq!(
        sample_lines(&out.text, "cpu_num"),
        ["cpu_num{host=\"kvm1\"} 16", "cpu_num{host=\"web\"} 4"]
    );
    assert!(out
        .text
        .contains("domain_alive{hypervisor=\"kvm1\",host=\"web\"} 1\n"));
    assert_eq!(out.samples, 3);

    // host-only metrics still come first
    let cpu_at = out.text.find("# HELP cpu_num").unwrap();
    let alive_at = out.text.find("# HELP domain_alive").unwrap();
    assert!(cpu_at < alive_at);
}
