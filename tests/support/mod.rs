//! Shared models and helpers for the integration tests.

#![allow(dead_code)]

pub mod models;

use active_record_rs::{ModelRepository, Record};
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. Set `RUST_LOG=active_record_rs=debug`
/// to see the statements and storage keys.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create and save a person, returning the saved record.
pub fn save_person(people: &ModelRepository, first_name: &str, last_name: &str) -> Record {
    let mut person = people.new_record();
    person.set("first_name", first_name).unwrap();
    person.set("last_name", last_name).unwrap();
    people.save(&mut person).unwrap();
    person
}
