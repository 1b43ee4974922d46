//! # Generic Messages
//!
//! The request envelope exchanged between a `ResourceClient` and its `ResourceActor`.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Message type sent to the actor to request operations.
///
/// The variants map onto the resource lifecycle (Create, Get, Update, Delete) plus:
///
/// - **Action**: a custom [`ActorEntity::Action`] against one entity. Unknown ids are
///   materialized through [`ActorEntity::implicit`] when the entity supports it.
/// - **List**: a snapshot of every entity currently held by the actor.
/// - **ForEach**: the same action applied to every entity in one message, used for
///   sweeps that must see a consistent store. Per-entity failures are reported
///   individually and do not stop the broadcast.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Create {
        id: T::Id,
        params: T::Create,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Update {
        id: T::Id,
        update: T::Update,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    List {
        respond_to: Response<Vec<T>>,
    },
    ForEach {
        action: T::Action,
        respond_to: Response<Vec<(T::Id, Result<T::ActionResult, FrameworkError>)>>,
    },
}
