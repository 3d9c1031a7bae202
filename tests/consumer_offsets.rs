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

mod common;

use common::FakeOffsetAuthority;
use session_ledger::configs::offset_store::OffsetStoreConfig;
use session_ledger::{
    MessageQueue, OffsetStore, ReadOffsetType, RemoteBrokerOffsetStore, OFFSET_UNKNOWN,
};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn offset_store(authority: &Arc<FakeOffsetAuthority>) -> RemoteBrokerOffsetStore {
    RemoteBrokerOffsetStore::new(
        "consumer-group",
        authority.clone(),
        authority.clone(),
        &OffsetStoreConfig::default(),
    )
}

#[tokio::test]
async fn consumed_offsets_should_round_trip_through_the_broker() {
    let authority = FakeOffsetAuthority::new();
    let producer_side = offset_store(&authority);
    let first = MessageQueue::new("orders", "broker-a", 0);
    let second = MessageQueue::new("orders", "broker-a", 1);

    producer_side.update_offset(&first, 120);
    producer_side.update_offset(&second, 80);
    producer_side
        .persist_all(&HashSet::from([first.clone(), second.clone()]))
        .await;

    let restarted = offset_store(&authority);
    restarted.load().await.unwrap();
    assert_eq!(
        restarted
            .read_offset(&first, ReadOffsetType::MemoryFirstThenStore)
            .await,
        120
    );
    assert_eq!(
        restarted
            .read_offset(&second, ReadOffsetType::MemoryFirstThenStore)
            .await,
        80
    );
    assert_eq!(authority.queries.load(Ordering::SeqCst), 2);

    restarted
        .read_offset(&first, ReadOffsetType::MemoryFirstThenStore)
        .await;
    assert_eq!(authority.queries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failing_queue_should_not_block_other_queues() {
    let authority = FakeOffsetAuthority::new();
    authority.failing_queues.lock().unwrap().insert(1);
    let store = offset_store(&authority);
    let failing = MessageQueue::new("orders", "broker-a", 1);
    let healthy = MessageQueue::new("orders", "broker-a", 2);
    store.update_offset(&failing, 10);
    store.update_offset(&healthy, 20);

    store
        .persist_all(&HashSet::from([failing.clone(), healthy.clone()]))
        .await;

    assert_eq!(authority.committed("orders", 1), None);
    assert_eq!(authority.committed("orders", 2), Some(20));
    assert_eq!(
        store
            .read_offset(&failing, ReadOffsetType::ReadFromStore)
            .await,
        OFFSET_UNKNOWN
    );
    assert_eq!(
        store
            .read_offset(&failing, ReadOffsetType::ReadFromMemory)
            .await,
        10
    );
}

#[tokio::test]
async fn unknown_route_should_be_refreshed_once() {
    let authority = FakeOffsetAuthority::new();
    authority.route_known.store(false, Ordering::SeqCst);
    authority
        .offsets
        .lock()
        .unwrap()
        .insert(("orders".to_string(), 0), 33);
    let store = offset_store(&authority);
    let mq = MessageQueue::new("orders", "broker-a", 0);

    assert_eq!(store.read_offset(&mq, ReadOffsetType::ReadFromStore).await, 33);
    assert_eq!(authority.route_refreshes.load(Ordering::SeqCst), 1);

    let unknown_broker = MessageQueue::new("orders", "broker-z", 0);
    assert_eq!(
        store
            .read_offset(&unknown_broker, ReadOffsetType::ReadFromStore)
            .await,
        OFFSET_UNKNOWN
    );
    assert_eq!(authority.route_refreshes.load(Ordering::SeqCst), 2);
}
