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

use crate::broker::producer_manager::ProducerManager;
use crate::configs::registry::RegistryConfig;
use crate::connection::PeerConnection;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Connection lifecycle notifications raised by the transport layer.
#[async_trait]
pub trait ConnectionEventListener: Send + Sync {
    async fn on_connect(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>);

    async fn on_close(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>);

    async fn on_exception(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>);

    async fn on_idle(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>);
}

/// Keeps the producer registry in sync with the transport: reconciles closed
/// connections and periodically evicts idle ones.
#[derive(Debug)]
pub struct ClientHousekeepingService {
    producer_manager: Arc<ProducerManager>,
    scan_interval: Duration,
    scanner: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl ClientHousekeepingService {
    pub fn new(producer_manager: Arc<ProducerManager>, config: &RegistryConfig) -> Self {
        Self {
            producer_manager,
            scan_interval: config.scan_interval,
            scanner: Mutex::new(None),
        }
    }

    pub async fn start(&self) {
        let mut scanner = self.scanner.lock().await;
        if scanner.is_some() {
            warn!("Client housekeeping service is already started.");
            return;
        }

        info!(
            "Client housekeeping service is enabled, inactive producer channels will be scanned every: {:?}",
            self.scan_interval
        );
        // A cancelled token stays cancelled, so every run gets a fresh one.
        let shutdown = CancellationToken::new();
        let handle = spawn_channel_scanner(
            self.producer_manager.clone(),
            self.scan_interval,
            shutdown.clone(),
        );
        *scanner = Some((shutdown, handle));
    }

    pub async fn shutdown(&self) {
        let scanner = self.scanner.lock().await.take();
        let Some((shutdown, handle)) = scanner else {
            debug!("Client housekeeping service is not running.");
            return;
        };
        shutdown.cancel();
        if let Err(error) = handle.await {
            warn!("Channel scanner task failed: {error}");
        }
        info!("Client housekeeping service has been stopped.");
    }
}

#[async_trait]
impl ConnectionEventListener for ClientHousekeepingService {
    async fn on_connect(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>) {
        debug!("Connection {} opened from {remote_addr}", connection.id());
    }

    async fn on_close(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>) {
        self.producer_manager
            .on_connection_closed(remote_addr, connection)
            .await;
    }

    async fn on_exception(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>) {
        self.producer_manager
            .on_connection_closed(remote_addr, connection)
            .await;
    }

    async fn on_idle(&self, remote_addr: &str, connection: &Arc<dyn PeerConnection>) {
        self.producer_manager
            .on_connection_closed(remote_addr, connection)
            .await;
    }
}

pub fn spawn_channel_scanner(
    producer_manager: Arc<ProducerManager>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    trace!("Channel scanner received shutdown signal.");
                    break;
                }
                _ = interval.tick() => {
                    let removed = producer_manager.scan_not_active_channel().await;
                    if removed > 0 {
                        info!("Removed {removed} expired producer channel entries.");
                    } else {
                        trace!("No expired producer channels found.");
                    }
                }
            }
        }
    })
}
