/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

//! Registry of connected producers, indexed twice.
//!
//! - hash index: producer group hash code -> channels, used for the random pick
//!   performed by transaction state checks. Distinct groups may share a bucket.
//! - group index: producer group name -> connection id -> channel.
//!
//! Each index has its own lock, acquired with a bounded wait. When a lock cannot
//! be taken in time that index is skipped for the call and a warning is logged;
//! the next call or sweep converges the state.

use crate::broker::client_channel_info::ClientChannelInfo;
use crate::clock::{Clock, SystemClock};
use crate::configs::registry::RegistryConfig;
use crate::connection::{ConnectionId, PeerConnection};
use crate::error::SessionError;
use ahash::AHashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const HASHCODE_CHANNEL_TABLE: &str = "hashcode_channel_table";
const GROUP_CHANNEL_TABLE: &str = "group_channel_table";

type HashcodeChannelTable = AHashMap<i32, Vec<Arc<ClientChannelInfo>>>;
type GroupChannelTable = AHashMap<String, AHashMap<ConnectionId, Arc<ClientChannelInfo>>>;

/// Hash code of a producer group name, compatible with the one computed by producers
/// (31-multiplier over UTF-16 code units, wrapping on overflow).
pub fn group_hash_code(group: &str) -> i32 {
    group
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

#[derive(Debug)]
pub struct ProducerManager {
    lock_timeout: Duration,
    channel_expired_timeout: Duration,
    clock: Arc<dyn Clock>,
    hashcode_channel_table: Mutex<HashcodeChannelTable>,
    group_channel_table: Mutex<GroupChannelTable>,
}

impl Default for ProducerManager {
    fn default() -> Self {
        Self::new(&RegistryConfig::default(), Arc::new(SystemClock))
    }
}

impl ProducerManager {
    pub fn new(config: &RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            lock_timeout: config.lock_timeout,
            channel_expired_timeout: config.channel_expired_timeout,
            clock,
            hashcode_channel_table: Mutex::new(AHashMap::new()),
            group_channel_table: Mutex::new(AHashMap::new()),
        }
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    async fn lock_table<'a, T>(
        &self,
        table: &'a Mutex<T>,
        index: &'static str,
    ) -> Result<MutexGuard<'a, T>, SessionError> {
        tokio::time::timeout(self.lock_timeout, table.lock())
            .await
            .map_err(|_| SessionError::LockTimeout {
                index,
                timeout: self.lock_timeout,
            })
    }

    /// Adds the channel to both indices, or refreshes the stored entry when the
    /// connection is already known.
    pub async fn register_producer(&self, group: &str, client_channel_info: ClientChannelInfo) {
        let group_hash = group_hash_code(group);
        let client_channel_info = Arc::new(client_channel_info);
        let connection_id = client_channel_info.connection_id();
        let now = self.now_millis();

        match self
            .lock_table(&self.hashcode_channel_table, HASHCODE_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                let channels = table.entry(group_hash).or_default();
                match channels
                    .iter()
                    .find(|existing| existing.connection_id() == connection_id)
                {
                    Some(existing) => existing.touch(now),
                    None => channels.push(client_channel_info.clone()),
                }
            }
            Err(error) => warn!("ProducerManager register_producer: {error}"),
        }

        match self
            .lock_table(&self.group_channel_table, GROUP_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                let channels = table.entry(group.to_string()).or_default();
                match channels.get(&connection_id) {
                    Some(existing) => existing.touch(now),
                    None => {
                        channels.insert(connection_id, client_channel_info.clone());
                        info!(
                            "new producer connected, group: {group} channel: {client_channel_info}"
                        );
                    }
                }
            }
            Err(error) => warn!("ProducerManager register_producer: {error}"),
        }
    }

    /// Removes the channel from both indices. Removing an unknown channel is a no-op.
    pub async fn unregister_producer(&self, group: &str, client_channel_info: &ClientChannelInfo) {
        let group_hash = group_hash_code(group);

        match self
            .lock_table(&self.hashcode_channel_table, HASHCODE_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                if let Some(channels) = table.get_mut(&group_hash) {
                    let before = channels.len();
                    channels.retain(|existing| **existing != *client_channel_info);
                    if channels.len() < before {
                        info!(
                            "unregister a producer[{group}] from hashcode_channel_table {client_channel_info}"
                        );
                    }
                    if channels.is_empty() {
                        table.remove(&group_hash);
                        info!("unregister a producer group[{group}] from hashcode_channel_table");
                    }
                }
            }
            Err(error) => warn!("ProducerManager unregister_producer: {error}"),
        }

        match self
            .lock_table(&self.group_channel_table, GROUP_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                if let Some(channels) = table.get_mut(group) {
                    if channels
                        .remove(&client_channel_info.connection_id())
                        .is_some()
                    {
                        info!(
                            "unregister a producer[{group}] from group_channel_table {client_channel_info}"
                        );
                    }
                    if channels.is_empty() {
                        table.remove(group);
                        info!("unregister a producer group[{group}] from group_channel_table");
                    }
                }
            }
            Err(error) => warn!("ProducerManager unregister_producer: {error}"),
        }
    }

    /// Best-effort pick: the bucket is keyed by hash code, so with colliding group
    /// names the returned channel may belong to another group.
    pub async fn pick_producer_channel_randomly(
        &self,
        producer_group_hash_code: i32,
    ) -> Option<Arc<ClientChannelInfo>> {
        match self
            .lock_table(&self.hashcode_channel_table, HASHCODE_CHANNEL_TABLE)
            .await
        {
            Ok(table) => {
                let channels = table.get(&producer_group_hash_code)?;
                if channels.is_empty() {
                    return None;
                }
                let index = rand::random::<u32>() as usize % channels.len();
                channels.get(index).cloned()
            }
            Err(error) => {
                warn!("ProducerManager pick_producer_channel_randomly: {error}");
                None
            }
        }
    }

    /// Evicts and closes channels idle for longer than the expiration timeout.
    /// Returns the number of entries removed from both indices.
    pub async fn scan_not_active_channel(&self) -> usize {
        let now = self.now_millis();
        let expired_timeout = self.channel_expired_timeout.as_millis() as u64;
        let mut removed = 0;

        let mut expired_channels = Vec::new();
        match self
            .lock_table(&self.hashcode_channel_table, HASHCODE_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                for (group_hash, channels) in table.iter_mut() {
                    channels.retain(|channel| {
                        if !channel.is_expired(now, expired_timeout) {
                            return true;
                        }
                        warn!(
                            "SCAN: remove expired channel[{}] from ProducerManager hashcode_channel_table, producer group hash code: {group_hash}",
                            channel.connection().remote_address()
                        );
                        expired_channels.push(channel.clone());
                        false
                    });
                }
                table.retain(|_, channels| !channels.is_empty());
            }
            Err(error) => warn!("ProducerManager scan_not_active_channel: {error}"),
        }
        removed += expired_channels.len();
        for channel in expired_channels.drain(..) {
            channel.connection().close();
        }

        match self
            .lock_table(&self.group_channel_table, GROUP_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                for (group, channels) in table.iter_mut() {
                    channels.retain(|_, channel| {
                        if !channel.is_expired(now, expired_timeout) {
                            return true;
                        }
                        warn!(
                            "SCAN: remove expired channel[{}] from ProducerManager group_channel_table, producer group name: {group}",
                            channel.connection().remote_address()
                        );
                        expired_channels.push(channel.clone());
                        false
                    });
                }
                table.retain(|_, channels| !channels.is_empty());
            }
            Err(error) => warn!("ProducerManager scan_not_active_channel: {error}"),
        }
        removed += expired_channels.len();
        for channel in expired_channels {
            channel.connection().close();
        }

        removed
    }

    /// Drops every entry of a connection that the transport already tore down.
    pub async fn on_connection_closed(
        &self,
        remote_addr: &str,
        connection: &Arc<dyn PeerConnection>,
    ) {
        let connection_id = connection.id();

        match self
            .lock_table(&self.hashcode_channel_table, HASHCODE_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                for (group_hash, channels) in table.iter_mut() {
                    let before = channels.len();
                    channels.retain(|channel| channel.connection_id() != connection_id);
                    if channels.len() < before {
                        info!(
                            "Connection closed, removed channel[{connection_id}][{remote_addr}] from ProducerManager hashcode_channel_table, producer group hash code: {group_hash}"
                        );
                    }
                }
                table.retain(|_, channels| !channels.is_empty());
            }
            Err(error) => warn!("ProducerManager on_connection_closed: {error}"),
        }

        match self
            .lock_table(&self.group_channel_table, GROUP_CHANNEL_TABLE)
            .await
        {
            Ok(mut table) => {
                for (group, channels) in table.iter_mut() {
                    if let Some(channel) = channels.remove(&connection_id) {
                        info!(
                            "Connection closed, removed channel[{channel}][{remote_addr}] from ProducerManager group_channel_table, producer group: {group}"
                        );
                    }
                }
                table.retain(|_, channels| !channels.is_empty());
            }
            Err(error) => warn!("ProducerManager on_connection_closed: {error}"),
        }
    }

    /// Snapshot of the hash index bucket. Empty on lock timeout.
    pub async fn channels_by_hash_code(&self, group_hash: i32) -> Vec<Arc<ClientChannelInfo>> {
        match self
            .lock_table(&self.hashcode_channel_table, HASHCODE_CHANNEL_TABLE)
            .await
        {
            Ok(table) => table.get(&group_hash).cloned().unwrap_or_default(),
            Err(error) => {
                warn!("ProducerManager channels_by_hash_code: {error}");
                Vec::new()
            }
        }
    }

    /// Connections registered for a single producer group. Empty on lock timeout.
    pub async fn producer_connections(&self, group: &str) -> Vec<Arc<ClientChannelInfo>> {
        match self
            .lock_table(&self.group_channel_table, GROUP_CHANNEL_TABLE)
            .await
        {
            Ok(table) => table
                .get(group)
                .map(|channels| channels.values().cloned().collect())
                .unwrap_or_default(),
            Err(error) => {
                warn!("ProducerManager producer_connections: {error}");
                Vec::new()
            }
        }
    }

    /// Copy of the whole group index, for admin queries.
    pub async fn group_channel_table(&self) -> HashMap<String, Vec<Arc<ClientChannelInfo>>> {
        match self
            .lock_table(&self.group_channel_table, GROUP_CHANNEL_TABLE)
            .await
        {
            Ok(table) => {
                debug!("Copying group_channel_table with {} groups", table.len());
                table
                    .iter()
                    .map(|(group, channels)| (group.clone(), channels.values().cloned().collect()))
                    .collect()
            }
            Err(error) => {
                warn!("ProducerManager group_channel_table: {error}");
                HashMap::new()
            }
        }
    }
}
