//! Component implementations.
//!
//! Each module implements [`Listable`](crate::component::Listable) and,
//! where records are written through the generic operations,
//! [`Component`](crate::component::Component) for one record kind.
//!
//! ```ignore
//! let pet = db.create::<Pet>(&req).await?;
//! let shelters = db.list::<Shelter>(&filter).await?;
//! ```

mod examination;
mod fund;
mod inventory;
mod message;
mod network;
mod pet;
mod post;
mod shelter;
mod user;
mod workflow;

pub use user::hash_password;
