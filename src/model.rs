pub mod like_counter;
pub mod reading_state;
