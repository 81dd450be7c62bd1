//! Tool discovery and dispatch
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ToolRegistry                               │
//! │                                             │
//! │  - Connects each configured server once     │
//! │  - Keeps tool schemas for the model         │
//! │  - Maps tool name -> owning connection      │
//! │  - Reloads when a server reports changes    │
//! └─────────────────────────────────────────────┘
//!           │
//!           │ scoped sessions (ping, tools/list, tools/call)
//!           ▼
//! ┌─────────────────────────────────────────────┐
//! │  Connections                                │
//! │    HTTP | stdio subprocess | in-process     │
//! └─────────────────────────────────────────────┘
//! ```

mod registry;

pub use registry::{ClientStats, ToolRegistry};
