//! Domain types for the crossover engine.

pub mod bar;
pub mod ids;
pub mod order;
pub mod position;

pub use bar::Bar;
pub use ids::{OrderId, OrderIdGen};
pub use order::{
    Fill, OrderKind, OrderNotification, OrderRequest, OrderStatus, PendingOrder, UnknownStatus,
};
pub use position::Position;
