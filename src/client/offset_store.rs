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

use crate::client::message_queue::MessageQueue;
use crate::error::SessionError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Returned by reads when the offset is unknown or could not be fetched.
pub const OFFSET_UNKNOWN: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOffsetType {
    /// Cached value only, never contacts the broker.
    ReadFromMemory,
    /// Always asks the broker, ignoring any cached value.
    ReadFromStore,
    /// Cached value when present, otherwise asks the broker.
    MemoryFirstThenStore,
}

/// Consumption progress of one consumer group, per message queue.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    async fn load(&self) -> Result<(), SessionError>;

    fn update_offset(&self, mq: &MessageQueue, offset: i64);

    /// Returns [`OFFSET_UNKNOWN`] instead of failing.
    async fn read_offset(&self, mq: &MessageQueue, read_type: ReadOffsetType) -> i64;

    /// Pushes cached offsets of the given queues. Failures are logged per queue.
    async fn persist_all(&self, mqs: &HashSet<MessageQueue>);

    async fn persist(&self, mq: &MessageQueue);

    fn clone_offset_table(&self, topic: &str) -> HashMap<MessageQueue, i64>;
}
