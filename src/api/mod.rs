//! REST API endpoint implementations.
//!
//! Each sub-module adds `async` methods to
//! [`AntClient`](crate::client::AntClient) via `impl` blocks.
//!
//! | Module | Endpoints | Description |
//! |---|---|---|
//! | [`contracts`] | 1 | Master contract download, instrument directory |

pub mod contracts;
