// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! MIME type of an ingested image, as determined by Intake (`spec.md` §4.5).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VaultError;

const ACCEPTED_PREFIXES: &[&str] = &["image/"];

/// A validated `image/*` MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MimeType(String);

impl MimeType {
    pub fn parse(raw: impl Into<String>) -> Result<Self, VaultError> {
        let raw = raw.into();
        if !ACCEPTED_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            return Err(VaultError::input(format!("unsupported mime type: {}", raw)));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
