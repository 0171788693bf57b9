//! Side effects of the order lifecycle.
//!
//! Stock adjustment and customer notifications run after the state change
//! that triggered them has committed. They are handed to a background
//! worker through a bounded channel; the handoff never blocks and never
//! fails the caller. Each call runs under a short timeout and failures are
//! logged and dropped (at-most-once delivery).
//!
//! The payment authority lives here too, but unlike the other
//! collaborators it is called synchronously: a declined charge must stop
//! order creation.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod notice;
pub mod services;

pub use config::DispatchConfig;
pub use dispatcher::{DispatchWorker, Dispatcher, SideEffect};
pub use error::DispatchError;
pub use notice::{AuthToken, NoticeLine, OrderNotice, StatusNotice};
pub use services::{
    InMemoryNotifier, InMemoryPaymentAuthority, InMemoryStockAdjuster, LoggingNotifier,
    LoggingStockAdjuster, Notification, Notifier, PaymentAuthority, StockAdjuster, StockAdjustment,
};
