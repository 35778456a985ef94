//! Shared helpers for integration tests

use chrono::Utc;

/// Build a provider timeline body with one daily point per value, the last
/// point landing `lag_days` before today
pub fn timeline_body(values: &[f64], lag_days: i64) -> String {
    let today = Utc::now().date_naive();
    let n = values.len() as i64;

    let entries: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let date = today - chrono::Duration::days(lag_days + n - 1 - i as i64);
            let secs = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
            format!(r#"{{"time":"{secs}","value":[{v}]}}"#)
        })
        .collect();

    format!(
        r#"{{"default":{{"timelineData":[{}]}}}}"#,
        entries.join(",")
    )
}

/// An empty provider timeline (the normal "no data" outcome)
pub fn empty_body() -> String {
    r#"{"default":{"timelineData":[]}}"#.to_string()
}

/// Sixty quiet days followed by a spike at 95 today
pub fn spike_values() -> Vec<f64> {
    let mut values = vec![20.0; 60];
    values.push(95.0);
    values
}

/// Sixty-one days of flat, unremarkable interest
pub fn quiet_values() -> Vec<f64> {
    vec![20.0; 61]
}
