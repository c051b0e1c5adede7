// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trait boundaries for this system's external collaborators: the router
//! driver, the event bus, the persistent store, the notification
//! dispatcher, config-file generation, quiet hours, and the process
//! supervisor. Each has an in-memory/fake implementation sufficient to
//! drive the test suite, gated behind the `test-support` feature where one
//! is defined in this crate.

mod bus;
mod config_gen;
mod dispatch;
mod router;
mod store;
mod supervisor;

pub use bus::EventBus;
pub use config_gen::{ConfigFormat, ConfigGenerator};
pub use dispatch::{ChannelResult, Notification, NotificationDispatcher, QuietHours};
pub use router::{RouterAction, RouterCommand, RouterCommandResult, RouterDriver, RouterQuery};
pub use store::Store;
pub use supervisor::{HostMemory, IsolationConfig, ProcessDescriptor, Supervisor};
