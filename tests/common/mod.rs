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

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use session_ledger::{
    BrokerAddressResolver, BrokerToClient, CheckTransactionStateRequestHeader, ConnectionId,
    FindBrokerResult, MessageStore, OffsetRpcClient, PeerConnection,
    QueryConsumerOffsetRequestHeader, SessionError, UpdateConsumerOffsetRequestHeader,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
pub struct TestConnection {
    id: u64,
    closed: AtomicBool,
}

impl TestConnection {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl PeerConnection for TestConnection {
    fn id(&self) -> ConnectionId {
        ConnectionId(self.id)
    }

    fn remote_address(&self) -> String {
        format!("127.0.0.1:{}", 40_000 + self.id)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: HashMap<i64, Bytes>,
}

impl InMemoryMessageStore {
    pub fn with_message(commit_log_offset: i64, payload: &'static [u8]) -> Self {
        Self {
            messages: HashMap::from([(commit_log_offset, Bytes::from_static(payload))]),
        }
    }
}

impl MessageStore for InMemoryMessageStore {
    fn select_one_message_by_offset(&self, commit_log_offset: i64, msg_size: u32) -> Option<Bytes> {
        self.messages
            .get(&commit_log_offset)
            .filter(|message| message.len() == msg_size as usize)
            .cloned()
    }
}

#[derive(Debug, Default)]
pub struct RecordingBrokerToClient {
    pub sent: Mutex<Vec<(ConnectionId, CheckTransactionStateRequestHeader, Bytes)>>,
}

#[async_trait]
impl BrokerToClient for RecordingBrokerToClient {
    async fn check_producer_transaction_state(
        &self,
        connection: Arc<dyn PeerConnection>,
        header: CheckTransactionStateRequestHeader,
        message: Bytes,
    ) -> Result<(), SessionError> {
        self.sent
            .lock()
            .unwrap()
            .push((connection.id(), header, message));
        Ok(())
    }
}

/// Broker that owns every queue of `broker-a`, with switchable failures.
#[derive(Debug, Default)]
pub struct FakeOffsetAuthority {
    pub offsets: Mutex<HashMap<(String, u32), i64>>,
    pub failing_queues: Mutex<HashSet<u32>>,
    pub route_known: AtomicBool,
    pub route_refreshes: AtomicUsize,
    pub queries: AtomicUsize,
    pub updates: AtomicUsize,
}

impl FakeOffsetAuthority {
    pub fn new() -> Arc<Self> {
        let authority = Self::default();
        authority.route_known.store(true, Ordering::SeqCst);
        Arc::new(authority)
    }

    pub fn committed(&self, topic: &str, queue_id: u32) -> Option<i64> {
        self.offsets
            .lock()
            .unwrap()
            .get(&(topic.to_string(), queue_id))
            .copied()
    }

    fn check_failure(
        &self,
        operation: &'static str,
        addr: &str,
        queue_id: u32,
    ) -> Result<(), SessionError> {
        if self.failing_queues.lock().unwrap().contains(&queue_id) {
            return Err(SessionError::RemoteFailure {
                operation,
                address: addr.to_string(),
                reason: "SYSTEM_ERROR".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerAddressResolver for FakeOffsetAuthority {
    fn find_broker_address_in_admin(&self, broker_name: &str) -> Option<FindBrokerResult> {
        if broker_name == "broker-a" && self.route_known.load(Ordering::SeqCst) {
            return Some(FindBrokerResult {
                broker_addr: "127.0.0.1:10911".to_string(),
                slave: false,
            });
        }
        None
    }

    async fn update_topic_route_info(&self, _topic: &str) {
        self.route_refreshes.fetch_add(1, Ordering::SeqCst);
        self.route_known.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl OffsetRpcClient for FakeOffsetAuthority {
    async fn query_consumer_offset(
        &self,
        addr: &str,
        header: &QueryConsumerOffsetRequestHeader,
        _timeout: Duration,
    ) -> Result<i64, SessionError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_failure("query_consumer_offset", addr, header.queue_id)?;
        self.committed(&header.topic, header.queue_id)
            .ok_or_else(|| SessionError::RemoteFailure {
                operation: "query_consumer_offset",
                address: addr.to_string(),
                reason: "QUERY_NOT_FOUND".to_string(),
            })
    }

    async fn update_consumer_offset(
        &self,
        addr: &str,
        header: &UpdateConsumerOffsetRequestHeader,
        _timeout: Duration,
    ) -> Result<(), SessionError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_failure("update_consumer_offset", addr, header.queue_id)?;
        self.offsets
            .lock()
            .unwrap()
            .insert((header.topic.clone(), header.queue_id), header.commit_offset);
        Ok(())
    }
}
