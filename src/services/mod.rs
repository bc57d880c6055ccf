// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - data accessors and their view state.

pub mod comments;
pub mod dashboard;
pub mod live;
pub mod notify;
pub mod profile;
pub mod store;
pub mod upload;
pub mod videos;
pub mod views;

pub use comments::{CommentThread, OwnerComments};
pub use dashboard::Dashboard;
pub use live::{LiveHandle, Refresh};
pub use notify::{Notice, Notifier, Variant};
pub use profile::ProfileService;
pub use store::{Loadable, Store};
pub use upload::VideoUploader;
pub use videos::VideoFeed;
pub use views::ViewCounter;
