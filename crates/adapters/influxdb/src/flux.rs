//! Flux query construction.
//!
//! Every metric is read the same way: the trailing hour of the series,
//! averaged into one-minute windows, empty windows dropped. The caller keeps
//! the last window.

use std::fmt::Write as _;

use crate::config::Series;

/// Build the Flux query reading `entity_id` from `bucket`.
#[must_use]
pub fn latest_mean(bucket: &str, series: &Series, entity_id: &str) -> String {
    let mut query = format!("from(bucket: \"{}\")\n  |> range(start: -1h)\n", escape(bucket));
    if let Some(domain) = &series.domain {
        filter(&mut query, "domain", domain);
    }
    filter(&mut query, "entity_id", entity_id);
    filter(&mut query, "_field", "value");
    filter(&mut query, "_measurement", &series.unit);
    query.push_str("  |> aggregateWindow(every: 1m, fn: mean, createEmpty: false)\n");
    query.push_str("  |> yield(name: \"mean\")\n");
    query
}

fn filter(query: &mut String, column: &str, value: &str) {
    let _ = writeln!(
        query,
        "  |> filter(fn: (r) => r[\"{column}\"] == \"{}\")",
        escape(value)
    );
}

/// Escape a value for use inside a Flux string literal.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
