//! # Cart Client
//!
//! High-level API over the Cart actor, one method per host-platform cart event.
use crate::cart_actor::{CartAction, CartActionResult, CartError, Replaced};
use crate::model::{Cart, CartItemKey, CartLine, CartLineInput, ClaimId, ProductId, SessionId};
use actor_framework::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

/// Client for interacting with the Cart actor.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<Cart>,
}

#[async_trait]
impl ActorClient<Cart> for CartClient {
    type Error = CartError;

    fn inner(&self) -> &ResourceClient<Cart> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        CartError::from_framework(e)
    }
}

fn unexpected(result: CartActionResult) -> CartError {
    CartError::ActorCommunicationError(format!("unexpected cart result: {result:?}"))
}

impl CartClient {
    pub fn new(inner: ResourceClient<Cart>) -> Self {
        Self { inner }
    }

    async fn act(
        &self,
        session_id: &SessionId,
        action: CartAction,
    ) -> Result<CartActionResult, CartError> {
        self.inner
            .perform_action(session_id.clone(), action)
            .await
            .map_err(CartError::from_framework)
    }

    /// Current lines of a session's cart; empty when the session has no cart.
    #[instrument(skip(self))]
    pub async fn lines(&self, session_id: &SessionId) -> Result<Vec<CartLine>, CartError> {
        Ok(self
            .get(session_id.clone())
            .await?
            .map(|cart| cart.lines)
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        session_id: &SessionId,
        input: CartLineInput,
    ) -> Result<CartLine, CartError> {
        debug!("Sending request");
        match self.act(session_id, CartAction::AddLine(input)).await? {
            CartActionResult::AddLine(line) => Ok(line),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn change_quantity(
        &self,
        session_id: &SessionId,
        key: &CartItemKey,
        quantity: u32,
    ) -> Result<Option<CartLine>, CartError> {
        let action = CartAction::ChangeQuantity {
            key: key.clone(),
            quantity,
        };
        match self.act(session_id, action).await? {
            CartActionResult::ChangeQuantity(line) => Ok(line),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_line(
        &self,
        session_id: &SessionId,
        key: &CartItemKey,
    ) -> Result<Option<CartLine>, CartError> {
        let action = CartAction::RemoveLine {
            key: key.clone(),
            product_id: None,
        };
        match self.act(session_id, action).await? {
            CartActionResult::RemoveLine(line) => Ok(line),
            other => Err(unexpected(other)),
        }
    }

    /// Polling-interface removal keyed by cart item and product.
    ///
    /// Returns whether a hold was restored. A second call for the same line returns `false`.
    #[instrument(skip(self))]
    pub async fn restore_stock_on_remove(
        &self,
        session_id: &SessionId,
        key: &CartItemKey,
        product_id: &ProductId,
    ) -> Result<bool, CartError> {
        let action = CartAction::RemoveLine {
            key: key.clone(),
            product_id: Some(product_id.clone()),
        };
        match self.act(session_id, action).await? {
            CartActionResult::RemoveLine(line) => Ok(line.is_some_and(|line| line.held)),
            other => Err(unexpected(other)),
        }
    }

    /// Cart-emptied event: every held line is released.
    #[instrument(skip(self))]
    pub async fn empty(&self, session_id: &SessionId) -> Result<Vec<CartLine>, CartError> {
        match self.act(session_id, CartAction::Empty).await? {
            CartActionResult::Empty(lines) => Ok(lines),
            other => Err(unexpected(other)),
        }
    }

    /// Load hand-off: the cart becomes `lines`. Holds of replaced lines are released unless
    /// their claim is in `keep`. Incoming lines that no longer fit the available stock come
    /// back in [`Replaced::dropped`].
    #[instrument(skip(self, lines, keep))]
    pub async fn replace_lines(
        &self,
        session_id: &SessionId,
        lines: Vec<CartLine>,
        keep: Vec<ClaimId>,
    ) -> Result<Replaced, CartError> {
        match self
            .act(session_id, CartAction::ReplaceLines { lines, keep })
            .await?
        {
            CartActionResult::ReplaceLines(replaced) => Ok(replaced),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self, lines))]
    pub async fn restore_lines(
        &self,
        session_id: &SessionId,
        lines: Vec<CartLine>,
    ) -> Result<Vec<CartLine>, CartError> {
        match self.act(session_id, CartAction::RestoreLines(lines)).await? {
            CartActionResult::RestoreLines(lines) => Ok(lines),
            other => Err(unexpected(other)),
        }
    }

    /// Removes every line without releasing, for a checkout or save hand-off.
    #[instrument(skip(self))]
    pub async fn take_lines(&self, session_id: &SessionId) -> Result<Vec<CartLine>, CartError> {
        match self.act(session_id, CartAction::TakeLines).await? {
            CartActionResult::TakeLines(lines) => Ok(lines),
            other => Err(unexpected(other)),
        }
    }

    /// Page-load sweep of one session's cart.
    #[instrument(skip(self))]
    pub async fn sweep_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<CartLine>, CartError> {
        match self.act(session_id, CartAction::SweepExpired { now }).await? {
            CartActionResult::SweepExpired(lines) => Ok(lines),
            other => Err(unexpected(other)),
        }
    }

    /// Sweeps every active cart in one actor message.
    ///
    /// A cart whose release fails keeps its lines for the next sweep; the failure is logged.
    #[instrument(skip(self))]
    pub async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(SessionId, CartLine)>, CartError> {
        let results = self
            .inner
            .for_each(CartAction::SweepExpired { now })
            .await
            .map_err(CartError::from_framework)?;

        let mut removed = Vec::new();
        for (session_id, result) in results {
            match result {
                Ok(CartActionResult::SweepExpired(lines)) => {
                    removed.extend(lines.into_iter().map(|line| (session_id.clone(), line)));
                }
                Ok(other) => return Err(unexpected(other)),
                Err(e) => warn!(%session_id, error = %e, "Cart sweep failed"),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_framework::mock::{create_mock_client, expect_action};
    use chrono::TimeZone;

    fn line(key: &str) -> CartLine {
        CartLine {
            key: CartItemKey(key.to_string()),
            product_id: ProductId(1),
            variant_id: None,
            quantity: 2,
            pack_size: 1,
            expires_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 20, 0).unwrap(),
            held: true,
            claim: ClaimId::new(),
        }
    }

    #[tokio::test]
    async fn test_restore_stock_on_remove_guards_product() {
        let (client, mut receiver) = create_mock_client::<Cart>(10);
        let carts = CartClient::new(client);
        let session = SessionId::from("abc");

        let task = tokio::spawn(async move {
            carts
                .restore_stock_on_remove(&session, &CartItemKey("1".into()), &ProductId(1))
                .await
        });

        let (id, action, responder) = expect_action(&mut receiver)
            .await
            .expect("Expected Action request");
        assert_eq!(id, SessionId::from("abc"));
        match action {
            CartAction::RemoveLine { key, product_id } => {
                assert_eq!(key, CartItemKey("1".into()));
                assert_eq!(product_id, Some(ProductId(1)));
            }
            other => panic!("Expected RemoveLine, got {other:?}"),
        }
        responder
            .send(Ok(CartActionResult::RemoveLine(Some(line("1")))))
            .unwrap();

        assert!(task.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_domain_errors_survive_the_actor_boundary() {
        let (client, mut receiver) = create_mock_client::<Cart>(10);
        let carts = CartClient::new(client);

        let task = tokio::spawn(async move {
            carts
                .add_line(&SessionId::from("abc"), CartLineInput::simple(ProductId(1), 100))
                .await
        });

        let (_, _, responder) = expect_action(&mut receiver).await.unwrap();
        responder
            .send(Err(FrameworkError::entity(CartError::InsufficientStock {
                requested: 100,
                available: 3,
            })))
            .unwrap();

        assert_eq!(
            task.await.unwrap(),
            Err(CartError::InsufficientStock {
                requested: 100,
                available: 3
            })
        );
    }

    #[tokio::test]
    async fn test_closed_actor_maps_to_communication_error() {
        let (client, receiver) = create_mock_client::<Cart>(1);
        drop(receiver);
        let carts = CartClient::new(client);

        let result = carts.lines(&SessionId::from("abc")).await;
        assert!(matches!(result, Err(CartError::ActorCommunicationError(_))));
    }
}
