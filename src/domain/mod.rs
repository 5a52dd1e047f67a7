//! Domain Layer
//!
//! Identifiers, items and the payload families stored on the board.

mod block;
mod error;
mod ids;
mod item;
mod widget;

pub use block::{BlockKind, BlockPayload, ChecklistEntry};
pub use error::{RemoteError, RemoteResult, ValidationError};
pub use ids::{ItemId, OwnerId, ParseIdError, LOCAL_PREFIX};
pub use item::{Item, ItemKind, ItemPatch, Payload};
pub use widget::{
    ChartStyle, Metric, TaskFilter, WidgetConfig, WidgetKind, WidgetPayload, WidgetSize,
};
