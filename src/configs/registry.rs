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

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(3_000);
pub const DEFAULT_CHANNEL_EXPIRED_TIMEOUT: Duration = Duration::from_millis(120_000);
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(10_000);

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Upper bound on waiting for either index lock.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub lock_timeout: Duration,
    /// Idle time after which a producer channel is evicted and closed.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub channel_expired_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub scan_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            channel_expired_timeout: DEFAULT_CHANNEL_EXPIRED_TIMEOUT,
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}
