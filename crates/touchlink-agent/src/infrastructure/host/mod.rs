//! Host adapters implementing the application-layer capability traits.
//!
//! Device builds provide adapters over the platform's accessibility and
//! input-injection services.  The in-memory adapters in [`mock`] are used
//! by the tests and by the agent binary when no device adapter is present.

pub mod mock;
