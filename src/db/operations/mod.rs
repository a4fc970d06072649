pub mod proficiency;

pub use proficiency::{get_proficiency_state, list_proficiency_states, upsert_proficiency_state};
