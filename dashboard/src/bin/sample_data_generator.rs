//! Sample data generator for exercising the dashboard without a database
//!
//! Writes `query_history.json` and `query_summary.json` in the shape the
//! backend returns from `/api/query_history` and `/api/query_summary`, so
//! they can be served from a static directory.
//!
//! Usage:
//!   cargo run --bin sample_data_generator [scenario]
//!
//! Scenarios:
//!   simple   - 3 queries, 1 day of 5 minute buckets
//!   spike    - One query regresses for an hour
//!   many     - 15 queries, more than the chart ranks
//!   sparse   - Gaps, a keyless row and numeric checksums
//!   full     - 12 queries over two weeks, late regression (default)

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const HISTORY_FILE: &str = "query_history.json";
const SUMMARY_FILE: &str = "query_summary.json";

/// Backend dates are HTTP dates
fn http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

struct Digest {
    checksum: Value,
    sample: &'static str,
    /// Mean seconds per execution
    base_time: f64,
    calls: u64,
}

fn make_digest(checksum: &str, sample: &'static str, base_time: f64, calls: u64) -> Digest {
    Digest {
        checksum: json!(checksum),
        sample,
        base_time,
        calls,
    }
}

/// Deterministic wobble in [0.5, 1.5) so runs are reproducible
fn wobble(seed: u64) -> f64 {
    let x = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    0.5 + ((x >> 33) % 1000) as f64 / 1000.0
}

fn make_row(digest: &Digest, ts: DateTime<Utc>, factor: f64) -> Value {
    let calls = ((digest.calls as f64) * factor).round().max(1.0) as u64;
    let time_sum = digest.base_time * calls as f64 * factor;
    json!({
        "checksum": digest.checksum,
        "ts_min": http_date(ts),
        "sample": digest.sample,
        // MySQL DECIMAL columns come back as strings
        "Query_time_sum": format!("{:.6}", time_sum),
        "Query_time_max": format!("{:.6}", digest.base_time * factor * 2.0),
        "ts_cnt": calls,
        "Rows_sent_sum": calls * 10,
        "Rows_examined_sum": format!("{}", calls * 1000),
    })
}

/// `factor(digest, bucket)` scales a row; `None` skips it
fn generate(
    digests: &[Digest],
    buckets: i64,
    step: Duration,
    mut factor: impl FnMut(usize, i64) -> Option<f64>,
) -> Vec<Value> {
    let start = Utc::now() - step * buckets as i32;
    let mut rows = Vec::new();
    for bucket in 0..buckets {
        let ts = start + step * bucket as i32;
        for (i, digest) in digests.iter().enumerate() {
            if let Some(f) = factor(i, bucket) {
                rows.push(make_row(digest, ts, f));
            }
        }
    }
    rows
}

fn simple_digests() -> Vec<Digest> {
    vec![
        make_digest("3F7A9C21D4E5B601", "SELECT * FROM orders WHERE customer_id = ?", 0.8, 12),
        make_digest("8B21E07F99AA0C13", "UPDATE   inventory\n  SET qty = qty - ? WHERE sku = ?", 0.3, 40),
        make_digest("C0FFEE1234567890", "SELECT COUNT(*) FROM sessions WHERE expires_at < NOW()", 2.1, 3),
    ]
}

fn generate_simple() -> Vec<Value> {
    let digests = simple_digests();
    generate(&digests, 288, Duration::minutes(5), |i, b| {
        Some(wobble((i as u64) << 32 | b as u64))
    })
}

fn generate_spike() -> Vec<Value> {
    let digests = simple_digests();
    generate(&digests, 288, Duration::minutes(5), |i, b| {
        let base = wobble((i as u64) << 32 | b as u64);
        if i == 0 && (200..212).contains(&b) {
            Some(base * 8.0)
        } else {
            Some(base)
        }
    })
}

fn generate_many() -> Vec<Value> {
    let digests: Vec<Digest> = (0..15)
        .map(|i| Digest {
            checksum: json!(format!("{:016X}", 0xA000_0000_0000_0000u64 + i * 7919)),
            sample: "SELECT id, name FROM users WHERE email LIKE ? ORDER BY created_at DESC",
            base_time: 0.1 * (i + 1) as f64,
            calls: 5 + i,
        })
        .collect();
    generate(&digests, 144, Duration::minutes(10), |i, b| {
        Some(wobble((i as u64) << 32 | b as u64))
    })
}

fn generate_sparse() -> Vec<Value> {
    let digests = vec![
        Digest {
            checksum: json!(1234567890123456789u64),
            sample: "DELETE FROM audit_log WHERE created_at < ?",
            base_time: 4.0,
            calls: 1,
        },
        make_digest("5EED5EED5EED5EED", "SELECT * FROM reports", 1.2, 2),
    ];
    let mut rows = generate(&digests, 96, Duration::minutes(15), |i, b| {
        // the first digest only runs every few hours
        (i == 1 || b % 12 == 0).then(|| wobble(b as u64))
    });
    rows.push(json!({
        "checksum": null,
        "ts_min": http_date(Utc::now()),
        "sample": "orphaned row",
        "Query_time_sum": "0.5",
    }));
    rows
}

fn generate_full() -> Vec<Value> {
    let mut digests = simple_digests();
    digests.extend((0..9).map(|i| Digest {
        checksum: json!(format!("{:016X}", 0xB000_0000_0000_0000u64 + i * 104729)),
        sample: "SELECT p.*, c.name FROM products p JOIN categories c ON c.id = p.category_id WHERE p.price > ?",
        base_time: 0.05 * (i + 1) as f64,
        calls: 2 + i,
    }));
    generate(&digests, 14 * 24, Duration::hours(1), |i, b| {
        let base = wobble((i as u64) << 32 | b as u64);
        if i == 2 && b > 14 * 24 - 6 {
            Some(base * 5.0)
        } else {
            Some(base)
        }
    })
}

/// One row per checksum, heaviest first, like the summary endpoint
fn summarize(history: &[Value]) -> Vec<Value> {
    let mut totals: BTreeMap<String, (Value, f64, f64, u64, u64, u64)> = BTreeMap::new();

    for row in history {
        let checksum = &row["checksum"];
        if checksum.is_null() {
            continue;
        }
        let number = |field: &str| match &row[field] {
            Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
            other => other.as_f64().unwrap_or(0.0),
        };
        let entry = totals
            .entry(checksum.to_string())
            .or_insert_with(|| (row.clone(), 0.0, 0.0, 0, 0, 0));
        entry.1 += number("Query_time_sum");
        entry.2 = entry.2.max(number("Query_time_max"));
        entry.3 += number("ts_cnt") as u64;
        entry.4 += number("Rows_sent_sum") as u64;
        entry.5 += number("Rows_examined_sum") as u64;
    }

    let mut rows: Vec<_> = totals.into_values().collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    rows.into_iter()
        .map(|(first, time_sum, time_max, calls, sent, examined)| {
            json!({
                "checksum": first["checksum"],
                "sample": first["sample"],
                "Query_time_sum": format!("{:.6}", time_sum),
                "Query_time_max": format!("{:.6}", time_max),
                "ts_cnt": calls,
                "Rows_sent_sum": sent,
                "Rows_examined_sum": examined,
            })
        })
        .collect()
}

fn main() -> Result<()> {
    let scenario = std::env::args().nth(1).unwrap_or_else(|| "full".to_string());

    let history = match scenario.as_str() {
        "simple" => generate_simple(),
        "spike" => generate_spike(),
        "many" => generate_many(),
        "sparse" => generate_sparse(),
        _ => generate_full(),
    };
    let summary = summarize(&history);

    std::fs::write(HISTORY_FILE, serde_json::to_string_pretty(&history)?)
        .with_context(|| format!("Failed to write {}", HISTORY_FILE))?;
    std::fs::write(SUMMARY_FILE, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("Failed to write {}", SUMMARY_FILE))?;

    println!(
        "Generated {} history rows and {} summary rows with scenario: {}",
        history.len(),
        summary.len(),
        scenario
    );
    println!("\nAvailable scenarios:");
    println!("  simple  - 3 queries, 1 day of 5 minute buckets");
    println!("  spike   - One query regresses for an hour");
    println!("  many    - 15 queries, more than the chart ranks");
    println!("  sparse  - Gaps, a keyless row and numeric checksums");
    println!("  full    - 12 queries over two weeks, late regression (default)");
    Ok(())
}
