// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

/// A time-ordered record identifier.
///
/// Backed by a UUID v7 and always rendered in the canonical hyphenated lowercase form, so the
/// string ordering of two ids matches their creation order. Ids double as directory names in
/// the history folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Issues a fresh id that sorts after every id previously issued by this process.
    pub fn generate() -> Self {
        Self {
            value: next_v7().hyphenated().to_string(),
            _marker: PhantomData,
        }
    }

    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        let uuid = validate_id(&value)?;
        Ok(Self {
            value: uuid.hyphenated().to_string(),
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id is not a valid uuid: {value:?}")]
    Malformed { value: String },
}

/// Checks whether a directory name is a record id in its canonical form.
///
/// Record directories are named by the hyphenated lowercase id, so braced, simple, `urn:`
/// and uppercase spellings of a valid UUID do not count.
pub fn is_record_id(value: &str) -> bool {
    validate_id(value).is_ok_and(|uuid| {
        let mut buf = Uuid::encode_buffer();
        *uuid.hyphenated().encode_lower(&mut buf) == *value
    })
}

fn validate_id(value: &str) -> Result<Uuid, IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    Uuid::parse_str(value).map_err(|_| IdError::Malformed {
        value: value.to_owned(),
    })
}

// `Uuid::now_v7` only orders ids across milliseconds; ids issued within the same millisecond
// are bumped past the previous one.
fn next_v7() -> Uuid {
    static LAST: Mutex<u128> = Mutex::new(0);

    let candidate = Uuid::now_v7().as_u128();
    let mut last = LAST.lock().unwrap_or_else(PoisonError::into_inner);
    let value = if candidate > *last {
        candidate
    } else {
        *last + 1
    };
    *last = value;
    Uuid::from_u128(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryIdTag {}
pub type EntryId = Id<EntryIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditIdTag {}
pub type EditId = Id<EditIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RunIdTag {}
/// Names one batch of output images (`output-<run_id>-<n>.<ext>`).
pub type RunId = Id<RunIdTag>;
