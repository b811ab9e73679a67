pub mod breakpoint;
pub mod dsp;
pub mod error;
pub mod patch;
pub mod sample;
pub mod wave;

pub use crate::breakpoint::{Breakpoint, BreakpointStream, Breakpoints};
pub use crate::error::{FormatError, Result, SonanceError};
pub use crate::patch::TonePatch;
pub use crate::sample::{AudioBuffer, BitDepth, Format};
pub use crate::wave::{Wave, WaveInfo};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the sonance-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Header summary of a WAVE file held in memory.
pub fn wav_info(bytes: &[u8]) -> Result<WaveInfo> {
    Ok(wave::decode_wave(bytes)?.info())
}

/// Render a JSON [`TonePatch`] to WAVE file bytes.
pub fn render_patch(json: &str) -> Result<Vec<u8>> {
    let patch = TonePatch::from_json(json)?;
    dsp::renderer::render_wav(&patch)
}

/// Parse breakpoint text; errors carry a rendered diagnostic.
pub fn breakpoints_from_text(text: &str) -> std::result::Result<Breakpoints, String> {
    breakpoint::parse_breakpoints(text).map_err(|e| e.report(text))
}

/// WASM-exposed: decode a WAVE file and return its header summary as JSON.
#[wasm_bindgen]
pub fn decode_wav_info(bytes: &[u8]) -> std::result::Result<JsValue, JsValue> {
    let info = wav_info(bytes).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    serde_wasm_bindgen::to_value(&info).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a JSON tone patch to a WAV byte array.
#[wasm_bindgen]
pub fn render_patch_wav(json: &str) -> std::result::Result<Vec<u8>, JsValue> {
    render_patch(json).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: parse breakpoint text into an array of `{time, value}`.
#[wasm_bindgen]
pub fn parse_breakpoints(text: &str) -> std::result::Result<JsValue, JsValue> {
    let points = breakpoints_from_text(text).map_err(|report| JsValue::from_str(&report))?;
    serde_wasm_bindgen::to_value(&points).map_err(|e| JsValue::from_str(&format!("{e}")))
}
