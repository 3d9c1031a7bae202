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

use crate::connection::{ConnectionId, PeerConnection};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A producer connection as seen by the registry.
///
/// Equality is connection identity only, so a fresh instance built for a
/// heartbeat matches the one already stored in either index.
#[derive(Debug)]
pub struct ClientChannelInfo {
    connection: Arc<dyn PeerConnection>,
    client_id: String,
    version: String,
    last_update_timestamp: AtomicU64,
}

impl ClientChannelInfo {
    pub fn new(
        connection: Arc<dyn PeerConnection>,
        client_id: impl Into<String>,
        version: impl Into<String>,
        now_millis: u64,
    ) -> Self {
        Self {
            connection,
            client_id: client_id.into(),
            version: version.into(),
            last_update_timestamp: AtomicU64::new(now_millis),
        }
    }

    pub fn connection(&self) -> &Arc<dyn PeerConnection> {
        &self.connection
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn last_update_timestamp(&self) -> u64 {
        self.last_update_timestamp.load(Ordering::Acquire)
    }

    /// Never moves the timestamp backwards.
    pub fn touch(&self, now_millis: u64) {
        self.last_update_timestamp
            .fetch_max(now_millis, Ordering::AcqRel);
    }

    pub fn is_expired(&self, now_millis: u64, expired_timeout_millis: u64) -> bool {
        now_millis.saturating_sub(self.last_update_timestamp()) > expired_timeout_millis
    }
}

impl PartialEq for ClientChannelInfo {
    fn eq(&self, other: &Self) -> bool {
        self.connection.id() == other.connection.id()
    }
}

impl Eq for ClientChannelInfo {}

impl Display for ClientChannelInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ClientChannelInfo {{ connection: {}@{}, client_id: {}, version: {}, last_update_timestamp: {} }}",
            self.connection.id(),
            self.connection.remote_address(),
            self.client_id,
            self.version,
            self.last_update_timestamp()
        )
    }
}
