// crates/oms-server/tests/end_to_end.rs
//
// Venue, store, router and clients over real loopback sockets.
mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{eventually, local_config};
use oms_core::{IdGenerator, NewOrder, OrdStatus, Side};
use oms_protocol::orders;
use oms_protocol::tags;
use oms_server::client::OrderClient;
use oms_server::router::RouterNode;
use oms_server::store::StoreNode;
use oms_server::venue::VenueNode;
use oms_server::Config;
use tokio::time::timeout;

const BOUND: Duration = Duration::from_secs(5);

struct System {
    config: Config,
    venue: VenueNode,
    store: StoreNode,
    router: RouterNode,
}

impl System {
    async fn start() -> System {
        let config = local_config();
        let ids = Arc::new(IdGenerator::seeded(24));

        let venue = VenueNode::start(&config, 0, ids.clone()).await.unwrap();
        let store = StoreNode::start(&config, 0).await.unwrap();
        let router = RouterNode::start(&config, 0, venue.port(), store.port(), ids)
            .await
            .unwrap();

        System {
            config,
            venue,
            store,
            router,
        }
    }

    async fn client(&self) -> OrderClient {
        OrderClient::connect(&self.config, self.router.port()).await.unwrap()
    }

    async fn stop(self) {
        self.router.shutdown();
        timeout(BOUND, self.router.wait()).await.unwrap();
        self.venue.shutdown();
        self.store.shutdown();
        timeout(BOUND, self.venue.wait()).await.unwrap();
        timeout(BOUND, self.store.wait()).await.unwrap();
    }
}

async fn next_status(client: &mut OrderClient) -> (String, OrdStatus) {
    let report = client.next_report(BOUND).await.expect("no execution report");
    let parsed = orders::parse_execution_report(&report).unwrap();
    (parsed.cl_ord_id, parsed.status)
}

#[tokio::test]
async fn single_order_lifecycle() {
    let system = System::start().await;
    let mut client = system.client().await;

    assert!(client.submit(&NewOrder::new("X", Side::Buy, 1, "100.00", "GBP")));

    assert_eq!(next_status(&mut client).await, ("X".to_string(), OrdStatus::New));
    assert_eq!(next_status(&mut client).await, ("X".to_string(), OrdStatus::PartialFill));
    assert_eq!(next_status(&mut client).await, ("X".to_string(), OrdStatus::Fill));
    assert!(client.next_report(Duration::from_millis(200)).await.is_none());

    let records = system.store.records();
    assert!(eventually(BOUND, || records.status("X") == Some(OrdStatus::Fill)).await);
    assert!(eventually(BOUND, || system.router.router().in_flight() == 0).await);

    client.close().await;
    system.stop().await;
}

#[tokio::test]
async fn store_answers_status_queries_over_the_wire() {
    let system = System::start().await;
    let mut client = system.client().await;

    client.submit(&NewOrder::new("Q1", Side::Sell, 10, "99.00", "EUR"));
    for _ in 0..3 {
        next_status(&mut client).await;
    }
    let records = system.store.records();
    assert!(eventually(BOUND, || records.status("Q1") == Some(OrdStatus::Fill)).await);

    let mut auditor = OrderClient::connect(&system.config, system.store.port())
        .await
        .unwrap();
    assert!(auditor.request_status("Q1"));

    let reply = auditor.next_report(BOUND).await.unwrap();
    assert_eq!(reply.get(tags::EXEC_TYPE), Some(tags::EXEC_TYPE_ORDER_STATUS));
    assert_eq!(reply.get(tags::ORD_STATUS), Some("2"));
    assert_eq!(reply.get(tags::SIDE), Some("2"));
    assert_eq!(reply.get(tags::CURRENCY), Some("EUR"));

    auditor.close().await;
    client.close().await;
    system.stop().await;
}

#[tokio::test]
async fn concurrent_clients_only_see_their_own_orders() {
    const CLIENTS: usize = 6;
    const ORDERS: usize = 5;

    let system = System::start().await;

    let mut tasks = Vec::new();
    for c in 0..CLIENTS {
        let mut client = system.client().await;
        tasks.push(tokio::spawn(async move {
            let mine: HashSet<String> = (0..ORDERS).map(|o| format!("C{c}-O{o}")).collect();
            for id in &mine {
                assert!(client.submit(&NewOrder::new(id.as_str(), Side::Buy, 10, "1.00", "GBP")));
            }

            let mut fills = HashSet::new();
            for _ in 0..ORDERS * 3 {
                let (id, status) = next_status(&mut client).await;
                assert!(mine.contains(&id), "client {c} received a report for {id}");
                if status == OrdStatus::Fill {
                    fills.insert(id);
                }
            }
            assert_eq!(fills, mine);
            assert!(client.next_report(Duration::from_millis(200)).await.is_none());
            client.close().await;
        }));
    }

    for task in tasks {
        timeout(BOUND * 2, task).await.unwrap().unwrap();
    }

    assert!(eventually(BOUND, || system.router.router().in_flight() == 0).await);
    assert_eq!(system.store.records().len(), CLIENTS * ORDERS);

    system.stop().await;
}

#[tokio::test]
async fn client_disconnect_is_cleaned_up_on_the_router() {
    let system = System::start().await;
    let client = system.client().await;
    let manager = system.router.node().manager();
    // venue + store + client
    assert!(eventually(BOUND, || manager.session_count() == 3).await);

    client.close().await;

    assert!(eventually(BOUND, || manager.session_count() == 2).await);
    system.stop().await;
}
