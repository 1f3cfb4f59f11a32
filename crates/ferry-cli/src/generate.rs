//! Demo records for `ferry run`.

use ferry_core::{RecordFields, WriteRequest};

const GENDERS: [&str; 3] = ["Male", "Female", "Other"];
const STREETS: [&str; 4] = ["Main St", "Oak Ave", "Pine Rd", "Elm Way"];

/// `count` write requests with fresh keys and predictable fields.
pub fn demo_requests(count: usize) -> Vec<WriteRequest> {
    (1..=count).map(|i| WriteRequest::new(demo_fields(i))).collect()
}

fn demo_fields(i: usize) -> RecordFields {
    RecordFields {
        name: format!("User {i}"),
        email: format!("user{i}@example.com"),
        gender: GENDERS[i % GENDERS.len()].to_string(),
        address: format!("{} {}", 100 + i, STREETS[i % STREETS.len()]),
    }
}
