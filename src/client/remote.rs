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

//! Collaborators the client uses to reach the broker owning a queue.

use crate::error::SessionError;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindBrokerResult {
    pub broker_addr: String,
    pub slave: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConsumerOffsetRequestHeader {
    pub consumer_group: String,
    pub topic: String,
    pub queue_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConsumerOffsetRequestHeader {
    pub consumer_group: String,
    pub topic: String,
    pub queue_id: u32,
    pub commit_offset: i64,
}

/// Route lookups backed by the name server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerAddressResolver: Send + Sync {
    fn find_broker_address_in_admin(&self, broker_name: &str) -> Option<FindBrokerResult>;

    /// Best effort; failures are handled by the resolver itself.
    async fn update_topic_route_info(&self, topic: &str);
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OffsetRpcClient: Send + Sync {
    async fn query_consumer_offset(
        &self,
        addr: &str,
        header: &QueryConsumerOffsetRequestHeader,
        timeout: Duration,
    ) -> Result<i64, SessionError>;

    async fn update_consumer_offset(
        &self,
        addr: &str,
        header: &UpdateConsumerOffsetRequestHeader,
        timeout: Duration,
    ) -> Result<(), SessionError>;
}
