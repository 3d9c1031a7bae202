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

//! Session bookkeeping for a pub/sub broker and its clients.
//!
//! - `broker`: producer connection registry, housekeeping and transaction state checks.
//! - `client`: consumer offset store backed by the owning broker.

pub mod broker;
pub mod client;
pub mod clock;
pub mod configs;
pub mod connection;
pub mod error;
pub mod logging;

pub use broker::client_channel_info::ClientChannelInfo;
pub use broker::housekeeping::{ClientHousekeepingService, ConnectionEventListener};
pub use broker::producer_manager::{group_hash_code, ProducerManager};
pub use broker::transaction_check::{
    BrokerToClient, CheckTransactionStateRequestHeader, DefaultTransactionCheckExecutor,
    MessageStore, TransactionCheckExecutor,
};
pub use client::message_queue::MessageQueue;
pub use client::offset_store::{OffsetStore, ReadOffsetType, OFFSET_UNKNOWN};
pub use client::remote::{
    BrokerAddressResolver, FindBrokerResult, OffsetRpcClient, QueryConsumerOffsetRequestHeader,
    UpdateConsumerOffsetRequestHeader,
};
pub use client::remote_broker_offset_store::RemoteBrokerOffsetStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use configs::SessionConfig;
pub use connection::{ConnectionId, PeerConnection};
pub use error::SessionError;
