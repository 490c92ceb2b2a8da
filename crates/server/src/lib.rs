pub mod errors;
pub mod identity;
pub mod state;
pub mod routes;
pub mod startup;

pub use startup::run;
