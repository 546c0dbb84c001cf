pub mod auto;
pub mod callback;
pub mod driver;
pub mod event;
pub mod event_queue;
pub mod fleet;
pub mod handle;
pub mod random;
