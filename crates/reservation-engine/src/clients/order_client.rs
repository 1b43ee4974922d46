//! # Order Client
//!
//! Provides a high‑level API for interacting with the `Order` actor.
//! Reservation bookkeeping happens in the Order actor's `on_create` hook and actions.
use crate::model::{ExternalStatus, Order, OrderCreate, OrderId, OrderUpdate, ProductId};
use crate::order_actor::{OrderAction, OrderActionResult, OrderError};
use actor_framework::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for interacting with the Order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

fn unexpected(result: OrderActionResult) -> OrderError {
    OrderError::ActorCommunicationError(format!("unexpected order result: {result:?}"))
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>) -> Self {
        Self { inner }
    }

    async fn act(&self, order_id: &OrderId, action: OrderAction) -> Result<OrderActionResult, OrderError> {
        self.inner
            .perform_action(order_id.clone(), action)
            .await
            .map_err(OrderError::from_framework)
    }

    /// Places an order, converting its lines' holds into reservations.
    ///
    /// An id that is already placed fails with [`OrderError::AlreadyPlaced`] and leaves the
    /// holds in `params` untouched, so the caller still owns them.
    #[instrument(skip(self, params))]
    pub async fn create_order(&self, order_id: OrderId, params: OrderCreate) -> Result<OrderId, OrderError> {
        debug!(lines = params.lines.len(), "create_order called");
        self.inner
            .create(order_id, params)
            .await
            .map_err(OrderError::from_framework)
    }

    #[instrument(skip(self))]
    pub async fn update_order(&self, order_id: &OrderId, update: OrderUpdate) -> Result<Order, OrderError> {
        self.inner
            .update(order_id.clone(), update)
            .await
            .map_err(OrderError::from_framework)
    }

    /// Returns whether this call released the order's reservations.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: &OrderId, reason: Option<String>) -> Result<bool, OrderError> {
        match self.act(order_id, OrderAction::Cancel { reason }).await? {
            OrderActionResult::Cancel(released) => Ok(released),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the products whose reserved stock changed.
    #[instrument(skip(self))]
    pub async fn observe_external_status(
        &self,
        order_id: &OrderId,
        status: ExternalStatus,
    ) -> Result<Vec<ProductId>, OrderError> {
        match self
            .act(order_id, OrderAction::ObserveExternalStatus(status))
            .await?
        {
            OrderActionResult::ObserveExternalStatus(products) => Ok(products),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn record_sync(
        &self,
        order_id: &OrderId,
        external_id: String,
        external_status: ExternalStatus,
    ) -> Result<Order, OrderError> {
        let action = OrderAction::RecordSync {
            external_id,
            external_status,
        };
        match self.act(order_id, action).await? {
            OrderActionResult::RecordSync(order) => Ok(order),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self, message))]
    pub async fn add_note(
        &self,
        order_id: &OrderId,
        message: impl Into<String>,
    ) -> Result<Order, OrderError> {
        match self.act(order_id, OrderAction::AddNote(message.into())).await? {
            OrderActionResult::AddNote(order) => Ok(order),
            other => Err(unexpected(other)),
        }
    }

    /// Finds the local order synced under `external_id`.
    #[instrument(skip(self))]
    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Order>, OrderError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|order| order.external_id.as_deref() == Some(external_id)))
    }
}

#[async_trait]
impl ActorClient<Order> for OrderClient {
    type Error = OrderError;

    fn inner(&self) -> &ResourceClient<Order> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        OrderError::from_framework(e)
    }
}
