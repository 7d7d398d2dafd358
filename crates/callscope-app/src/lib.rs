// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod aggregate;
pub mod columns;
pub mod fetch;
pub mod filters;
pub mod ids;
pub mod model;
pub mod pagination;
pub mod session;
pub mod sort;
pub mod state;

pub use aggregate::*;
pub use columns::*;
pub use fetch::*;
pub use filters::*;
pub use ids::*;
pub use model::*;
pub use pagination::*;
pub use session::*;
pub use sort::*;
pub use state::*;
