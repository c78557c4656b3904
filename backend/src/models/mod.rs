pub mod alert;
pub mod cluster;
pub mod notification;
pub mod resource_kind;

pub use alert::*;
pub use cluster::*;
pub use notification::*;
pub use resource_kind::ResourceKind;
