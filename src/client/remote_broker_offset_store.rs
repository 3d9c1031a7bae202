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

//! Offset store whose source of truth is the broker that owns each queue.
//!
//! Offsets are cached in a `DashMap` of atomic holders, so writers on different
//! queues never contend and the last write on a queue is never lost.

use crate::client::message_queue::MessageQueue;
use crate::client::offset_store::{OffsetStore, ReadOffsetType, OFFSET_UNKNOWN};
use crate::client::remote::{
    BrokerAddressResolver, FindBrokerResult, OffsetRpcClient, QueryConsumerOffsetRequestHeader,
    UpdateConsumerOffsetRequestHeader,
};
use crate::configs::offset_store::OffsetStoreConfig;
use crate::error::SessionError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct RemoteBrokerOffsetStore {
    group_name: String,
    resolver: Arc<dyn BrokerAddressResolver>,
    rpc_client: Arc<dyn OffsetRpcClient>,
    rpc_timeout: Duration,
    offset_table: DashMap<MessageQueue, Arc<AtomicI64>>,
}

impl RemoteBrokerOffsetStore {
    pub fn new(
        group_name: impl Into<String>,
        resolver: Arc<dyn BrokerAddressResolver>,
        rpc_client: Arc<dyn OffsetRpcClient>,
        config: &OffsetStoreConfig,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            resolver,
            rpc_client,
            rpc_timeout: config.rpc_timeout,
            offset_table: DashMap::new(),
        }
    }

    fn cached_offset(&self, mq: &MessageQueue) -> Option<i64> {
        self.offset_table
            .get(mq)
            .map(|offset| offset.load(Ordering::Acquire))
    }

    /// Resolves the broker address, refreshing the topic route once when unknown.
    async fn find_broker(&self, mq: &MessageQueue) -> Result<FindBrokerResult, SessionError> {
        if let Some(found) = self.resolver.find_broker_address_in_admin(&mq.broker_name) {
            return Ok(found);
        }

        debug!(
            "Broker: {} not found, refreshing route of topic: {}",
            mq.broker_name, mq.topic
        );
        self.resolver.update_topic_route_info(&mq.topic).await;
        self.resolver
            .find_broker_address_in_admin(&mq.broker_name)
            .ok_or_else(|| SessionError::BrokerNotFound(mq.broker_name.clone()))
    }

    async fn with_timeout<T, F>(
        &self,
        operation: &'static str,
        address: &str,
        call: F,
    ) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        tokio::time::timeout(self.rpc_timeout, call)
            .await
            .map_err(|_| SessionError::RemoteTimeout {
                operation,
                address: address.to_string(),
                timeout: self.rpc_timeout,
            })?
    }

    async fn fetch_consume_offset_from_broker(
        &self,
        mq: &MessageQueue,
    ) -> Result<i64, SessionError> {
        let broker = self.find_broker(mq).await?;
        let header = QueryConsumerOffsetRequestHeader {
            consumer_group: self.group_name.clone(),
            topic: mq.topic.clone(),
            queue_id: mq.queue_id,
        };
        self.with_timeout(
            "query_consumer_offset",
            &broker.broker_addr,
            self.rpc_client
                .query_consumer_offset(&broker.broker_addr, &header, self.rpc_timeout),
        )
        .await
    }

    async fn update_consume_offset_to_broker(
        &self,
        mq: &MessageQueue,
        offset: i64,
    ) -> Result<(), SessionError> {
        let broker = self.find_broker(mq).await?;
        let header = UpdateConsumerOffsetRequestHeader {
            consumer_group: self.group_name.clone(),
            topic: mq.topic.clone(),
            queue_id: mq.queue_id,
            commit_offset: offset,
        };
        self.with_timeout(
            "update_consumer_offset",
            &broker.broker_addr,
            self.rpc_client
                .update_consumer_offset(&broker.broker_addr, &header, self.rpc_timeout),
        )
        .await
    }
}

#[async_trait]
impl OffsetStore for RemoteBrokerOffsetStore {
    async fn load(&self) -> Result<(), SessionError> {
        Ok(())
    }

    fn update_offset(&self, mq: &MessageQueue, offset: i64) {
        // A writer losing the insert race still stores its value on the winning holder.
        self.offset_table
            .entry(mq.clone())
            .or_insert_with(|| Arc::new(AtomicI64::new(offset)))
            .store(offset, Ordering::Release);
    }

    async fn read_offset(&self, mq: &MessageQueue, read_type: ReadOffsetType) -> i64 {
        match read_type {
            ReadOffsetType::ReadFromMemory => {
                return self.cached_offset(mq).unwrap_or(OFFSET_UNKNOWN);
            }
            ReadOffsetType::MemoryFirstThenStore => {
                if let Some(offset) = self.cached_offset(mq) {
                    return offset;
                }
            }
            ReadOffsetType::ReadFromStore => {}
        }

        match self.fetch_consume_offset_from_broker(mq).await {
            Ok(broker_offset) if read_type == ReadOffsetType::ReadFromStore => {
                self.update_offset(mq, broker_offset);
                broker_offset
            }
            // An update_offset issued while the fetch was in flight wins over the broker value.
            Ok(broker_offset) => {
                let cached = self
                    .offset_table
                    .entry(mq.clone())
                    .or_insert_with(|| Arc::new(AtomicI64::new(broker_offset)))
                    .load(Ordering::Acquire);
                cached
            }
            Err(error) => {
                warn!(
                    "Failed to fetch consumer offset of group: {} for {mq}: {error}",
                    self.group_name
                );
                OFFSET_UNKNOWN
            }
        }
    }

    async fn persist_all(&self, mqs: &HashSet<MessageQueue>) {
        if mqs.is_empty() {
            return;
        }

        // Snapshot first so no map shard stays locked across the remote calls.
        let offsets: Vec<(MessageQueue, i64)> = self
            .offset_table
            .iter()
            .filter(|entry| mqs.contains(entry.key()))
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Acquire)))
            .collect();

        for (mq, offset) in offsets {
            if let Err(error) = self.update_consume_offset_to_broker(&mq, offset).await {
                error!("update_consume_offset_to_broker exception, {mq}: {error}");
            }
        }
    }

    async fn persist(&self, mq: &MessageQueue) {
        let Some(offset) = self.cached_offset(mq) else {
            return;
        };
        match self.update_consume_offset_to_broker(mq, offset).await {
            Ok(()) => info!(
                "[persist] Group: {} ClientId: {mq} update_consume_offset_to_broker {offset}",
                self.group_name
            ),
            Err(error) => error!("update_consume_offset_to_broker exception, {mq}: {error}"),
        }
    }

    fn clone_offset_table(&self, topic: &str) -> HashMap<MessageQueue, i64> {
        self.offset_table
            .iter()
            .filter(|entry| topic.is_empty() || entry.key().topic == topic)
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Acquire)))
            .collect()
    }
}
