/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, SubsecRound, Utc};

/// A stored value together with the revision it was read at
///
/// Passing the whole `Versioned` back to [`crate::BlockStore::update_block`]
/// is what makes the update a compare-and-swap: it only succeeds if the
/// stored revision still matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The stored value
    pub value: T,
    /// The revision the value was read at
    pub revision: Revision,
}

impl<T> Versioned<T> {
    pub fn new(value: T, revision: Revision) -> Self {
        Self { value, revision }
    }

    /// Drops the revision, returning the value
    pub fn into_inner(self) -> T {
        self.value
    }

    // Split the value and revision out, consuming the Versioned.
    pub fn take(self) -> (T, Revision) {
        (self.value, self.revision)
    }
}

impl<T> Deref for Versioned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for Versioned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

/// The revision of a stored record
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Incremented on every change of the record. Revision number 0 is never used.
    number: u64,
    /// When the record last changed. Only informational, never compared.
    timestamp: DateTime<Utc>,
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}-T{}", self.number, self.timestamp.timestamp_micros())
    }
}

impl Revision {
    /// The revision of a freshly created record
    pub fn initial() -> Self {
        Self {
            number: 1,
            timestamp: now(),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the next revision. Skips 0 on wrap-around.
    pub fn increment(&self) -> Self {
        let mut number = self.number.wrapping_add(1);
        number |= (number == 0) as u64;
        Self {
            number,
            timestamp: now(),
        }
    }

    /// Whether a write made against `self` is still valid for a record now at
    /// `current`.
    pub fn matches(&self, current: &Revision) -> bool {
        self.number == current.number
    }
}

// Revisions only ever show microseconds.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
