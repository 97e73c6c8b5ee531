pub mod delivery;
pub mod event;
pub mod scheduling;
pub mod settings;
