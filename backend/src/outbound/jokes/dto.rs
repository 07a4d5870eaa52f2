//! DTOs for decoding joke upstream responses.
//!
//! Only `value.joke` is used; the remaining fields are decoded so a
//! malformed envelope is rejected rather than silently accepted.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct JokeEnvelopeDto {
    #[serde(rename = "type")]
    pub(super) kind: String,
    pub(super) value: JokeValueDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct JokeValueDto {
    #[expect(dead_code, reason = "decoded for envelope validation only")]
    pub(super) id: i64,
    pub(super) joke: String,
    #[serde(default)]
    #[expect(dead_code, reason = "decoded for envelope validation only")]
    pub(super) categories: Vec<String>,
}

impl JokeEnvelopeDto {
    pub(super) fn into_joke(self) -> Result<String, String> {
        if self.kind != "success" {
            return Err(format!("joke service reported type {:?}", self.kind));
        }
        Ok(self.value.joke)
    }
}
