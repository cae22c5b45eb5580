//! Typed - 型付き Task API
//!
//! target path の typo を型で排除し、投入側と callback 側の対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `DeferredTask` trait, `CallbackHandler<T>` trait - 型安全
//! - **内部（Dyn）**: `DynCallbackHandler` trait - object-safe, type erasure

pub mod handler;
pub mod registry;
pub mod task;

pub use self::handler::{CallbackContext, CallbackError, CallbackHandler, DynCallbackHandler};
pub use self::registry::{CallbackRegistry, RegistryError};
pub use self::task::DeferredTask;
