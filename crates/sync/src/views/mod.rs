//! View models derived from cached query data.
//!
//! Each view is plain state plus an `apply` that re-derives it from the
//! latest cached JSON. Views never fetch; the facade feeds them from
//! store subscriptions.

pub mod conversations;
pub mod notifications;
pub mod students;

pub use conversations::{Composer, ConversationList, ConversationRow, MessageThread};
pub use notifications::NotificationView;
pub use students::{StudentQuery, StudentSearch};
