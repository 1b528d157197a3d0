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
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use ipnet::IpNet;

use crate::error::{StoreError, StoreResult};
use crate::model::{AffinityListOptions, AllocationBlock, BlockAffinity};
use crate::store::BlockStore;
use crate::version::{Revision, Versioned};

/// A [`BlockStore`] kept in process memory.
///
/// Every call runs under a single lock, which makes create-if-absent and
/// compare-and-swap atomic with respect to concurrent callers. Records are
/// keyed by their storage path, so listing a host's affinities is a prefix
/// scan just like against a real key/value backend.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    inner: Mutex<Records>,
}

#[derive(Debug, Default)]
struct Records {
    blocks: BTreeMap<String, Versioned<AllocationBlock>>,
    affinities: BTreeMap<String, Versioned<BlockAffinity>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> StoreResult<MutexGuard<'_, Records>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Snapshot of every stored block, ordered by storage path.
    pub fn blocks(&self) -> StoreResult<Vec<AllocationBlock>> {
        Ok(self
            .records()?
            .blocks
            .values()
            .map(|block| block.value.clone())
            .collect())
    }

    /// Snapshot of every stored affinity record, ordered by storage path.
    pub fn affinities(&self) -> StoreResult<Vec<BlockAffinity>> {
        Ok(self
            .records()?
            .affinities
            .values()
            .map(|affinity| affinity.value.clone())
            .collect())
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn get_block(&self, cidr: &IpNet) -> StoreResult<Versioned<AllocationBlock>> {
        let key = AllocationBlock::path_for(cidr);
        self.records()?
            .blocks
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn create_block(
        &self,
        block: AllocationBlock,
    ) -> StoreResult<Versioned<AllocationBlock>> {
        let key = block.path();
        let mut records = self.records()?;
        if records.blocks.contains_key(&key) {
            return Err(StoreError::already_exists(key));
        }
        let created = Versioned::new(block, Revision::initial());
        records.blocks.insert(key, created.clone());
        Ok(created)
    }

    async fn update_block(
        &self,
        block: Versioned<AllocationBlock>,
    ) -> StoreResult<Versioned<AllocationBlock>> {
        let key = block.path();
        let mut records = self.records()?;
        let stored = records
            .blocks
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(key.clone()))?;
        if !block.revision.matches(&stored.revision) {
            tracing::debug!(
                key = %key,
                expected = %block.revision,
                current = %stored.revision,
                "Revision mismatch updating block"
            );
            return Err(StoreError::UpdateConflict {
                key,
                expected: block.revision.number(),
                current: stored.revision.number(),
            });
        }
        let (value, revision) = block.take();
        *stored = Versioned::new(value, revision.increment());
        Ok(stored.clone())
    }

    async fn delete_block(&self, cidr: &IpNet) -> StoreResult<()> {
        let key = AllocationBlock::path_for(cidr);
        match self.records()?.blocks.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(key)),
        }
    }

    async fn create_affinity(
        &self,
        affinity: &BlockAffinity,
    ) -> StoreResult<Versioned<BlockAffinity>> {
        let key = affinity.path();
        let mut records = self.records()?;
        if records.affinities.contains_key(&key) {
            return Err(StoreError::already_exists(key));
        }
        let created = Versioned::new(affinity.clone(), Revision::initial());
        records.affinities.insert(key, created.clone());
        Ok(created)
    }

    async fn delete_affinity(&self, affinity: &BlockAffinity) -> StoreResult<()> {
        let key = affinity.path();
        match self.records()?.affinities.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(key)),
        }
    }

    async fn list_affinities(
        &self,
        options: &AffinityListOptions,
    ) -> StoreResult<Vec<Versioned<BlockAffinity>>> {
        let records = self.records()?;
        let matching = |affinity: &&Versioned<BlockAffinity>| options.matches(affinity);
        let listed = match &options.host {
            Some(host) => {
                let prefix = BlockAffinity::host_prefix(host);
                records
                    .affinities
                    .range(prefix.clone()..)
                    .take_while(|(key, _)| key.starts_with(&prefix))
                    .map(|(_, affinity)| affinity)
                    .filter(matching)
                    .cloned()
                    .collect()
            }
            None => records.affinities.values().filter(matching).cloned().collect(),
        };
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use ipam_network::IpVersion;

    use super::*;
    use crate::error::StoreErrorKind;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_block_create_is_exclusive() {
        let store = MemoryBlockStore::new();
        let cidr = net("10.0.0.0/26");

        let err = store.get_block(&cidr).await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::NotFound);

        let created = store.create_block(AllocationBlock::new(cidr)).await.unwrap();
        assert_eq!(created.revision.number(), 1);

        let err = store
            .create_block(AllocationBlock::new(cidr))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::AlreadyExists);

        assert_eq!(store.get_block(&cidr).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_update_is_compare_and_swap() {
        let store = MemoryBlockStore::new();
        let cidr = net("10.0.0.0/26");
        store.create_block(AllocationBlock::new(cidr)).await.unwrap();

        let mut first = store.get_block(&cidr).await.unwrap();
        let mut second = store.get_block(&cidr).await.unwrap();

        first.affinity = Some("a".to_string());
        let updated = store.update_block(first).await.unwrap();
        assert_eq!(updated.revision.number(), 2);

        // The second reader saw revision 1 and has to re-read.
        second.affinity = Some("b".to_string());
        let err = store.update_block(second).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::UpdateConflict {
                key: AllocationBlock::path_for(&cidr),
                expected: 1,
                current: 2,
            }
        );
        assert_eq!(
            store.get_block(&cidr).await.unwrap().affinity.as_deref(),
            Some("a")
        );

        store.delete_block(&cidr).await.unwrap();
        let err = store.update_block(updated).await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::NotFound);
        let err = store.delete_block(&cidr).await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_affinity_records() {
        let store = MemoryBlockStore::new();
        let records = [
            BlockAffinity::new("a", net("10.0.0.0/26")),
            BlockAffinity::new("a", net("fd00::/122")),
            BlockAffinity::new("ab", net("10.0.0.64/26")),
            BlockAffinity::new("b", net("10.0.0.128/26")),
        ];
        for record in &records {
            store.create_affinity(record).await.unwrap();
        }
        let err = store.create_affinity(&records[0]).await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::AlreadyExists);

        let listed: Vec<BlockAffinity> = store
            .list_affinities(&AffinityListOptions::for_host("a", IpVersion::V4))
            .await
            .unwrap()
            .into_iter()
            .map(Versioned::into_inner)
            .collect();
        assert_eq!(listed, vec![records[0].clone()]);

        let all = store
            .list_affinities(&AffinityListOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 4);

        let none = store
            .list_affinities(&AffinityListOptions::for_host("c", IpVersion::V4))
            .await
            .unwrap();
        assert!(none.is_empty());

        store.delete_affinity(&records[0]).await.unwrap();
        let err = store.delete_affinity(&records[0]).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.affinities().unwrap().len(), 3);
    }
}
