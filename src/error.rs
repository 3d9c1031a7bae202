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

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Lock on {index} not acquired within {timeout:?}")]
    LockTimeout {
        index: &'static str,
        timeout: Duration,
    },
    #[error("The broker[{0}] not exist")]
    BrokerNotFound(String),
    #[error("Remote call {operation} to {address} timed out after {timeout:?}")]
    RemoteTimeout {
        operation: &'static str,
        address: String,
        timeout: Duration,
    },
    #[error("Remote call {operation} to {address} failed: {reason}")]
    RemoteFailure {
        operation: &'static str,
        address: String,
        reason: String,
    },
    #[error("Transaction check dispatch failed: {0}")]
    DispatchFailed(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Cannot load configuration: {0}")]
    CannotLoadConfiguration(#[from] Box<figment::Error>),
    #[error("Cannot initialize logging: {0}")]
    LoggingInit(String),
}
