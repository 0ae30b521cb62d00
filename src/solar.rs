use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::state::{PowerHistory, SolarData};

// Literal envelope pieces, only used when the body is not valid JSON.
const ENVELOPE_PREFIX: &str = "{\"data\":\"";
const ENVELOPE_SUFFIX: &str = "\",\"success\":true,\"failCode\":0}";
const HTML_QUOTE: &str = "&quot;";

// ── Decoded payload ─────────────────────────────────────────────────

/// Values extracted from one kiosk response, before they touch the snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KioskPayload {
    pub active_power: Vec<f32>,
    pub real_time_power: f32,
    pub daily_energy: f32,
    pub month_energy: f32,
    pub year_energy: f32,
    pub cumulative_energy: f32,
    pub co2_reduction: f32,
    pub standard_coal_savings: f32,
    pub equivalent_tree_planting: f32,
}

// ── Kiosk envelope ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
    data: Option<Value>,
    success: Option<bool>,
    #[serde(rename = "failCode")]
    fail_code: Option<i64>,
}

/// Numbers as-is, numeric strings parsed, everything else (`"--"`, null,
/// missing) is zero.
fn lenient_number(value: Option<&Value>) -> f32 {
    let v = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0) as f32,
        Some(Value::String(s)) => s.trim().parse::<f32>().unwrap_or(0.0),
        _ => 0.0,
    };
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Old-style unwrapping by plain substring replacement.
fn strip_envelope_literal(body: &str) -> String {
    body.replace(HTML_QUOTE, "\"")
        .replace(ENVELOPE_PREFIX, "")
        .replace(ENVELOPE_SUFFIX, "")
}

/// Return the inner kiosk document carried by the response envelope.
///
/// The envelope is parsed as JSON first; its `data` string has `&quot;`
/// entities restored. A body that is valid JSON but carries no `data` field
/// is taken to be the document itself. A body that is not valid JSON falls
/// back to literal prefix/suffix stripping.
pub fn unwrap_envelope(body: &str) -> Result<String, FetchError> {
    let envelope = match serde_json::from_str::<Envelope>(body) {
        Ok(env) => env,
        Err(_) => return Ok(strip_envelope_literal(body)),
    };

    if envelope.success == Some(false) {
        return Err(FetchError::Upstream(envelope.fail_code.unwrap_or(-1)));
    }

    match envelope.data {
        Some(Value::String(inner)) => Ok(inner.replace(HTML_QUOTE, "\"")),
        Some(inner @ Value::Object(_)) => Ok(inner.to_string()),
        _ => Ok(body.replace(HTML_QUOTE, "\"")),
    }
}

/// Decode a raw response body into a [`KioskPayload`].
///
/// Only the inner text has to be JSON. Every field is looked up by path and
/// falls back to zero when it is missing or has the wrong type; a non-array
/// `activePower` yields no samples.
pub fn parse_kiosk_payload(body: &str) -> Result<KioskPayload, FetchError> {
    let inner = unwrap_envelope(body)?;
    let root: Value = serde_json::from_str(&inner)?;
    let number = |path: &str| lenient_number(root.pointer(path));

    let active_power = match root.pointer("/powerCurve/activePower") {
        Some(Value::Array(samples)) => samples.iter().map(|v| lenient_number(Some(v))).collect(),
        _ => Vec::new(),
    };

    Ok(KioskPayload {
        active_power,
        real_time_power: number("/realKpi/realTimePower"),
        daily_energy: number("/realKpi/dailyEnergy"),
        month_energy: number("/realKpi/monthEnergy"),
        year_energy: number("/realKpi/yearEnergy"),
        cumulative_energy: number("/realKpi/cumulativeEnergy"),
        co2_reduction: number("/socialContribution/co2Reduction"),
        standard_coal_savings: number("/socialContribution/standardCoalSavings"),
        equivalent_tree_planting: number("/socialContribution/equivalentTreePlanting"),
    })
}

/// Overwrite the solar snapshot with a decoded payload.
///
/// Samples past the history capacity are dropped; the chart peak carries
/// over from the previous snapshot and can only grow.
pub fn apply_payload(solar: &mut SolarData, payload: KioskPayload) {
    let mut history = PowerHistory::with_peak(solar.history.peak());
    let dropped = history.extend_clamped(payload.active_power);
    if dropped > 0 {
        warn!(
            "solar: {} active power samples beyond capacity {} dropped",
            dropped,
            history.capacity()
        );
    }

    *solar = SolarData {
        real_time_power: payload.real_time_power,
        daily_energy: payload.daily_energy,
        month_energy: payload.month_energy,
        year_energy: payload.year_energy,
        cumulative_energy: payload.cumulative_energy,
        co2_avoided: payload.co2_reduction,
        coal_saved: payload.standard_coal_savings,
        trees_planted: payload.equivalent_tree_planting,
        history,
    };
}

/// Parse a response body and, only if it decodes, replace the snapshot.
pub fn update_from_body(solar: &mut SolarData, body: &str) -> Result<(), FetchError> {
    let payload = parse_kiosk_payload(body)?;
    apply_payload(solar, payload);
    info!(
        "solar: {:.2} kW now, {:.2} kWh today, {} samples (peak {:.2})",
        solar.real_time_power,
        solar.daily_energy,
        solar.history.len(),
        solar.history.peak()
    );
    Ok(())
}
