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

/// The outcome classes of a store call that callers branch on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StoreErrorKind {
    /// The key is absent.
    NotFound,
    /// Create found the key already occupied.
    AlreadyExists,
    /// Update carried a stale revision.
    UpdateConflict,
    /// Anything else the backend reports.
    Backend,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("resource does not exist: {key}")]
    NotFound { key: String },

    #[error("resource already exists: {key}")]
    AlreadyExists { key: String },

    #[error("update conflict on {key}: revision {expected} is stale, current is {current}")]
    UpdateConflict {
        key: String,
        expected: u64,
        current: u64,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::NotFound { .. } => StoreErrorKind::NotFound,
            StoreError::AlreadyExists { .. } => StoreErrorKind::AlreadyExists,
            StoreError::UpdateConflict { .. } => StoreErrorKind::UpdateConflict,
            StoreError::Backend(_) => StoreErrorKind::Backend,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == StoreErrorKind::NotFound
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        StoreError::NotFound { key: key.into() }
    }

    pub fn already_exists(key: impl Into<String>) -> Self {
        StoreError::AlreadyExists { key: key.into() }
    }
}
