// Re-export all model types
pub use self::cart::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::events::*;
pub use self::notification::*;
pub use self::service::*;
pub use self::validation::*;

mod cart;
mod enums;
mod errors;
mod events;
mod notification;
mod service;
mod validation;
