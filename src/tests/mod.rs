pub mod utils;

mod loader_tests;
mod router_tests;
