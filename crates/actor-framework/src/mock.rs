//! # Mock Framework & Testing Guide
//!
//! `MockClient<T>` hands out a real `ResourceClient<T>` whose requests are answered from a
//! queue of expectations instead of a running actor. It is the way to test an actor whose
//! context holds other clients (a cart that calls the ledger) without spawning those
//! dependencies.
//!
//! | | MockClient | Real Actor |
//! |---|---|---|
//! | **State** | None, canned responses | Real state management |
//! | **Determinism** | Fully deterministic | Subject to scheduler |
//! | **Error injection** | `return_err` | Requires specific state |
//!
//! ## Testing Strategies
//!
//! 1. **Pure mock**: test a client wrapper's request/response mapping with
//!    [`create_mock_client`] and the `expect_*` helpers.
//! 2. **Single actor**: spawn one `ResourceActor` with `()` or a trivial context.
//! 3. **Actor with mocked dependencies**: spawn the actor under test and pass
//!    `MockClient::client()` clones in its context; assert on
//!    [`MockClient::received_actions`] afterwards.
//! 4. **Full system**: wire every actor the way production does.
//!
//! ```rust,ignore
//! let mut ledger = MockClient::<StockRecord>::new();
//! ledger.expect_action(product_id.clone()).return_ok(LedgerOutcome::Held(12));
//!
//! let (cart_actor, carts) = ResourceActor::<Cart>::new(8);
//! tokio::spawn(cart_actor.run(cart_context(ledger.client())));
//! // ... drive the cart ...
//! ledger.verify();
//! ```

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// One queued response. Ids, when present, must match the incoming request.
enum Expectation<T: ActorEntity> {
    Get {
        id: T::Id,
        response: Result<Option<T>, FrameworkError>,
    },
    Create {
        response: Result<T::Id, FrameworkError>,
    },
    Delete {
        id: T::Id,
        response: Result<(), FrameworkError>,
    },
    Action {
        id: T::Id,
        response: Result<T::ActionResult, FrameworkError>,
    },
    List {
        response: Result<Vec<T>, FrameworkError>,
    },
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock client with expectation tracking for fluent testing.
///
/// Expectations are consumed in order. A request that does not match the next expectation
/// (wrong kind or wrong id) panics the responder task, which the caller observes as
/// `FrameworkError::ActorDropped`.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Queue<T>,
    received: Arc<Mutex<Vec<(T::Id, T::Action)>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Queue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let received = Arc::new(Mutex::new(Vec::new()));
        let queue = expectations.clone();
        let log = received.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = lock(&queue).pop_front();

                match (request, expectation) {
                    (
                        ResourceRequest::Get { id, respond_to },
                        Some(Expectation::Get {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "MockClient: unexpected get id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Create { respond_to, .. },
                        Some(Expectation::Create { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Delete { id, respond_to },
                        Some(Expectation::Delete {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "MockClient: unexpected delete id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Action {
                            id,
                            action,
                            respond_to,
                        },
                        Some(Expectation::Action {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "MockClient: unexpected action id");
                        lock(&log).push((id, action));
                        let _ = respond_to.send(response);
                    }
                    (ResourceRequest::List { respond_to }, Some(Expectation::List { response })) => {
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            received,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Expects a `get` operation for `id`.
    pub fn expect_get(&mut self, id: T::Id) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `create` operation.
    pub fn expect_create(&mut self) -> CreateExpectationBuilder<T> {
        CreateExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `delete` operation for `id`.
    pub fn expect_delete(&mut self, id: T::Id) -> DeleteExpectationBuilder<T> {
        DeleteExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects an `action` operation against `id`.
    pub fn expect_action(&mut self, id: T::Id) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `list` operation.
    pub fn expect_list(&mut self) -> ListExpectationBuilder<T> {
        ListExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Every action received so far, in arrival order.
    pub fn received_actions(&self) -> Vec<(T::Id, T::Action)> {
        lock(&self.received).clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining != 0 {
            panic!("Not all expectations were met. {remaining} remaining");
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> std::sync::MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: Queue<T>,
}

impl<T: ActorEntity> GetExpectationBuilder<T> {
    pub fn return_ok(self, value: Option<T>) {
        lock(&self.expectations).push_back(Expectation::Get {
            id: self.id,
            response: Ok(value),
        });
    }

    pub fn return_err(self, error: FrameworkError) {
        lock(&self.expectations).push_back(Expectation::Get {
            id: self.id,
            response: Err(error),
        });
    }
}

/// Builder for `create` expectations.
pub struct CreateExpectationBuilder<T: ActorEntity> {
    expectations: Queue<T>,
}

impl<T: ActorEntity> CreateExpectationBuilder<T> {
    pub fn return_ok(self, id: T::Id) {
        lock(&self.expectations).push_back(Expectation::Create { response: Ok(id) });
    }

    pub fn return_err(self, error: FrameworkError) {
        lock(&self.expectations).push_back(Expectation::Create {
            response: Err(error),
        });
    }
}

/// Builder for `delete` expectations.
pub struct DeleteExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: Queue<T>,
}

impl<T: ActorEntity> DeleteExpectationBuilder<T> {
    pub fn return_ok(self) {
        lock(&self.expectations).push_back(Expectation::Delete {
            id: self.id,
            response: Ok(()),
        });
    }

    pub fn return_err(self, error: FrameworkError) {
        lock(&self.expectations).push_back(Expectation::Delete {
            id: self.id,
            response: Err(error),
        });
    }
}

/// Builder for `action` expectations.
pub struct ActionExpectationBuilder<T: ActorEntity> {
    id: T::Id,
    expectations: Queue<T>,
}

impl<T: ActorEntity> ActionExpectationBuilder<T> {
    pub fn return_ok(self, result: T::ActionResult) {
        lock(&self.expectations).push_back(Expectation::Action {
            id: self.id,
            response: Ok(result),
        });
    }

    pub fn return_err(self, error: FrameworkError) {
        lock(&self.expectations).push_back(Expectation::Action {
            id: self.id,
            response: Err(error),
        });
    }
}

/// Builder for `list` expectations.
pub struct ListExpectationBuilder<T: ActorEntity> {
    expectations: Queue<T>,
}

impl<T: ActorEntity> ListExpectationBuilder<T> {
    pub fn return_ok(self, items: Vec<T>) {
        lock(&self.expectations).push_back(Expectation::List { response: Ok(items) });
    }
}

// =============================================================================
// CHANNEL-LEVEL HELPERS
// =============================================================================

/// Creates a client whose requests land on a receiver the test controls.
///
/// Useful when the test needs to inspect the exact payload before choosing a response.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Waits for the next request and returns it if it is a Create.
pub async fn expect_create<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Create,
    tokio::sync::oneshot::Sender<Result<T::Id, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create {
            id,
            params,
            respond_to,
        }) => Some((id, params, respond_to)),
        _ => None,
    }
}

/// Waits for the next request and returns it if it is a Get.
pub async fn expect_get<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    tokio::sync::oneshot::Sender<Result<Option<T>, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Waits for the next request and returns it if it is an Action.
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    tokio::sync::oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        id: u32,
        value: i64,
    }

    #[derive(Debug)]
    struct CounterCreate;

    #[derive(Debug)]
    struct CounterUpdate;

    #[derive(Clone, Debug, PartialEq)]
    enum CounterAction {
        Add(i64),
    }

    #[derive(Debug, thiserror::Error)]
    #[error("counter error")]
    struct CounterError;

    #[async_trait]
    impl ActorEntity for Counter {
        type Id = u32;
        type Create = CounterCreate;
        type Update = CounterUpdate;
        type Action = CounterAction;
        type ActionResult = i64;
        type Context = ();
        type Error = CounterError;

        fn from_create_params(id: u32, _: CounterCreate) -> Result<Self, Self::Error> {
            Ok(Self { id, value: 0 })
        }

        async fn on_update(&mut self, _: CounterUpdate, _: &()) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn handle_action(&mut self, action: CounterAction, _: &()) -> Result<i64, Self::Error> {
            match action {
                CounterAction::Add(delta) => {
                    self.value += delta;
                    Ok(self.value)
                }
            }
        }
    }

    #[tokio::test]
    async fn test_channel_level_mock() {
        let (client, mut receiver) = create_mock_client::<Counter>(10);

        let task = tokio::spawn(async move { client.perform_action(7, CounterAction::Add(3)).await });

        let (id, action, responder) = expect_action(&mut receiver)
            .await
            .expect("Expected Action request");
        assert_eq!(id, 7);
        assert_eq!(action, CounterAction::Add(3));
        responder.send(Ok(3)).unwrap();

        assert_eq!(task.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_mock_client_records_actions() {
        let mut mock = MockClient::<Counter>::new();
        mock.expect_action(1).return_ok(5);
        mock.expect_get(1).return_ok(Some(Counter { id: 1, value: 5 }));

        let client = mock.client();
        assert_eq!(client.perform_action(1, CounterAction::Add(5)).await.unwrap(), 5);
        assert_eq!(client.get(1).await.unwrap().unwrap().value, 5);

        assert_eq!(mock.received_actions(), vec![(1, CounterAction::Add(5))]);
        mock.verify();
    }

    #[tokio::test]
    async fn test_mock_client_id_mismatch_surfaces_as_dropped() {
        let mut mock = MockClient::<Counter>::new();
        mock.expect_action(1).return_ok(5);

        let result = mock.client().perform_action(2, CounterAction::Add(5)).await;
        assert!(matches!(result, Err(FrameworkError::ActorDropped)));
    }
}
