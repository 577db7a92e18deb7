//! Internal types shared by the dispatcher and upstream clients

mod message;
mod request;
mod response;

pub use message::{Message, Role};
pub use request::{CompletionRequest, DispatchInput};
pub use response::{Completion, DispatchResponse, Usage};
