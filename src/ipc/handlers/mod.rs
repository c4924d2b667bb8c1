pub mod attendance;
pub mod calls;
pub mod core;
pub mod students;
