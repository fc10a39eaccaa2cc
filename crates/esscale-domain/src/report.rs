//! Human-readable run summary written to stdout.

use std::fmt::Write as _;

use crate::autoscaler::Evaluation;
use crate::config::AutoscalerConfig;
use crate::traits::ConfigUpdate;

pub fn render_config(config: &AutoscalerConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Using the following configuration:");
    let _ = writeln!(out, "DomainName:    {}", config.domain_name);
    let _ = writeln!(out, "min-slaves:    {}", config.params.min_nodes);
    let _ = writeln!(out, "max-slaves:    {}", config.params.max_nodes);
    let _ = writeln!(out, "percent-allow: {}", config.params.headroom_fraction);
    let _ = writeln!(out, "configure:     {}", config.configure);
    out
}

pub fn render_evaluation(evaluation: &Evaluation) -> String {
    let shape = &evaluation.shape;
    let decision = &evaluation.decision;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Cluster Nodes: {} ({} Masters and {} Slaves).",
        shape.total_nodes(),
        shape.master_count,
        shape.slave_count
    );
    let _ = writeln!(
        out,
        "Cluster Disk Space(GB): {} Total ({} Used, {} Available).",
        format_gb(evaluation.total_capacity_gb()),
        format_gb(evaluation.usage.used_gb),
        format_gb(evaluation.available_gb())
    );
    let _ = writeln!(
        out,
        "Cluster Slave Nodes: Currently using: {}, Need: {}, with allowance: {}, with safeguard: {}.",
        shape.slave_count,
        decision.required_nodes,
        decision.required_with_headroom,
        decision.target_nodes
    );
    out
}

pub fn render_update(update: &ConfigUpdate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Changing Configuration...");
    if update.is_noop() {
        let _ = writeln!(
            out,
            "Domain {}: instance count already {}.",
            update.domain_name, update.requested_instance_count
        );
    } else {
        let _ = writeln!(
            out,
            "Domain {}: instance count {} -> {} requested.",
            update.domain_name, update.previous_instance_count, update.requested_instance_count
        );
    }
    out
}

/// Two decimals with comma thousands separators, e.g. `12,345.68`.
pub fn format_gb(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}
