//! DTO for decoding name upstream responses.

use serde::Deserialize;

use crate::domain::ports::NameRecord;

#[derive(Debug, Deserialize)]
pub(super) struct NameDto {
    pub(super) name: String,
    pub(super) surname: String,
    #[serde(default)]
    pub(super) gender: String,
    #[serde(default)]
    pub(super) region: String,
}

impl From<NameDto> for NameRecord {
    fn from(dto: NameDto) -> Self {
        Self {
            first_name: dto.name,
            last_name: dto.surname,
            gender: dto.gender,
            region: dto.region,
        }
    }
}
