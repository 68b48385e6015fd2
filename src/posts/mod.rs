//! Posts domain: cached reads, draft form, pagination and the controller
//! that ties mutations to cache invalidation.

pub mod controller;
pub mod form;
pub mod notifications;
pub mod pagination;
pub mod queries;

pub use controller::PostsController;
pub use form::{Draft, Field};
pub use notifications::{Notification, NotificationKind};
pub use pagination::PageState;
