pub mod event_loop;
pub mod events;
pub mod history_repository;
pub mod hover_lookup;
pub mod pattern_engine;
pub mod radar_api;
pub mod refresh_scheduler;
pub mod source_switch;
pub mod timer;
pub mod view;

#[cfg(test)]
pub mod test_support;
