pub mod actions;

pub use actions::ActionService;
