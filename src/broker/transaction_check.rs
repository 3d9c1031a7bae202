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

//! Broker-initiated transaction state checks: the storage layer asks a producer
//! of the group what happened to a prepared message.

use crate::broker::producer_manager::ProducerManager;
use crate::configs::transaction::TransactionConfig;
use crate::connection::PeerConnection;
use crate::error::SessionError;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTransactionStateRequestHeader {
    pub tran_state_table_offset: i64,
    pub commit_log_offset: i64,
}

impl Display for CheckTransactionStateRequestHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckTransactionStateRequestHeader")
            .field("tran_state_table_offset", &self.tran_state_table_offset)
            .field("commit_log_offset", &self.commit_log_offset)
            .finish()
    }
}

/// Commit log lookup.
#[cfg_attr(test, mockall::automock)]
pub trait MessageStore: Send + Sync {
    fn select_one_message_by_offset(&self, commit_log_offset: i64, msg_size: u32) -> Option<Bytes>;
}

/// Requests sent from the broker to a connected client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerToClient: Send + Sync {
    async fn check_producer_transaction_state(
        &self,
        connection: Arc<dyn PeerConnection>,
        header: CheckTransactionStateRequestHeader,
        message: Bytes,
    ) -> Result<(), SessionError>;
}

#[async_trait]
pub trait TransactionCheckExecutor: Send + Sync {
    async fn goto_check(
        &self,
        producer_group_hash_code: i32,
        tran_state_table_offset: i64,
        commit_log_offset: i64,
        msg_size: u32,
    );
}

pub struct DefaultTransactionCheckExecutor {
    producer_manager: Arc<ProducerManager>,
    message_store: Arc<dyn MessageStore>,
    broker_to_client: Arc<dyn BrokerToClient>,
    check_timeout: Duration,
}

impl DefaultTransactionCheckExecutor {
    pub fn new(
        producer_manager: Arc<ProducerManager>,
        message_store: Arc<dyn MessageStore>,
        broker_to_client: Arc<dyn BrokerToClient>,
        config: &TransactionConfig,
    ) -> Self {
        Self {
            producer_manager,
            message_store,
            broker_to_client,
            check_timeout: config.check_timeout,
        }
    }
}

#[async_trait]
impl TransactionCheckExecutor for DefaultTransactionCheckExecutor {
    async fn goto_check(
        &self,
        producer_group_hash_code: i32,
        tran_state_table_offset: i64,
        commit_log_offset: i64,
        msg_size: u32,
    ) {
        let Some(client_channel_info) = self
            .producer_manager
            .pick_producer_channel_randomly(producer_group_hash_code)
            .await
        else {
            warn!(
                "check a producer transaction state, but not find any channel of this group[{producer_group_hash_code}]"
            );
            return;
        };

        let Some(message) = self
            .message_store
            .select_one_message_by_offset(commit_log_offset, msg_size)
        else {
            warn!(
                "check a producer transaction state, but not find message by commit_log_offset: {commit_log_offset}, msg_size: {msg_size}"
            );
            return;
        };

        let header = CheckTransactionStateRequestHeader {
            tran_state_table_offset,
            commit_log_offset,
        };
        let connection = client_channel_info.connection().clone();
        let remote_address = connection.remote_address();
        match tokio::time::timeout(
            self.check_timeout,
            self.broker_to_client
                .check_producer_transaction_state(connection, header, message),
        )
        .await
        {
            Ok(Ok(())) => debug!("Sent {header} to producer channel[{remote_address}]"),
            Ok(Err(error)) => warn!(
                "check a producer transaction state, failed to send {header} to channel[{remote_address}]: {error}"
            ),
            Err(_) => warn!(
                "check a producer transaction state, sending {header} to channel[{remote_address}] timed out after {:?}",
                self.check_timeout
            ),
        }
    }
}
