//! DTOs for decoding GitHub user search and profile payloads.
//!
//! The adapter decodes into these transport DTOs first, then maps into domain
//! records in one pass. Fields the pipeline does not use are ignored.

use serde::Deserialize;

use crate::domain::{DirectoryHit, UserProfile};

#[derive(Debug, Deserialize)]
pub(super) struct SearchResponseDto {
    pub(super) items: Vec<SearchItemDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchItemDto {
    pub(super) id: u64,
    pub(super) login: String,
    pub(super) avatar_url: String,
    pub(super) html_url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileDto {
    pub(super) name: Option<String>,
    pub(super) followers: u64,
}

impl SearchResponseDto {
    pub(super) fn into_domain_hits(self) -> Vec<DirectoryHit> {
        self.items
            .into_iter()
            .map(|item| DirectoryHit {
                id: item.id,
                login: item.login,
                avatar_url: item.avatar_url,
                html_url: item.html_url,
            })
            .collect()
    }
}

impl From<ProfileDto> for UserProfile {
    fn from(value: ProfileDto) -> Self {
        Self {
            display_name: value.name,
            followers: value.followers,
        }
    }
}
