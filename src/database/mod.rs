pub mod entity;
pub mod manager;

pub use entity::{EntityDescriptor, EntityKind};
pub use manager::{
    is_connection_error, ConnectionHandle, ConnectionManager, ConnectionState, DatabaseError,
    InitReport, ModelHandle,
};
