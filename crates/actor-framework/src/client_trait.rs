//! # ActorClient Trait
//!
//! Shared read/delete operations for resource-specific client wrappers, built on top of a
//! generic `ResourceClient`.
use crate::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

/// Trait for resource-specific clients to inherit the standard read operations.
///
/// A wrapper supplies its inner `ResourceClient` and an error mapping; `get`, `list` and
/// `delete` come for free.
///
/// ```rust,ignore
/// #[async_trait]
/// impl ActorClient<Order> for OrderClient {
///     type Error = OrderError;
///     fn inner(&self) -> &ResourceClient<Order> { &self.inner }
///     fn map_error(e: FrameworkError) -> OrderError { OrderError::from_framework(e) }
/// }
///
/// let order = order_client.get(order_id).await?;
/// ```
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The resource-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the specific resource error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch an entity by ID.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Fetch every entity the actor holds.
    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().list().await.map_err(Self::map_error)
    }

    /// Delete an entity by ID.
    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: T::Id) -> Result<(), Self::Error> {
        tracing::debug!("Sending request");
        self.inner().delete(id).await.map_err(Self::map_error)
    }
}
