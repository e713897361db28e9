//! Purpose: Client-side protocol engine for a mailbox object service, shared by the `mailrpc` CLI and tests.
//! Exports: `core` (data model, wire codecs, errors), `api` (executor, batches, subscriptions).
//! Role: Library backing the binary; callers build requests in `core` and run them through `api`.
//! Invariants: No network I/O happens in `core`; every call goes through an `api::Transport`.
//! Invariants: One request produces at most one transport call.
pub mod api;
pub mod core;
