// handlers/mod.rs - request handlers
//
// Handlers only run after the route guard, the authorization gate and the
// validation gate have all passed (see routes.rs). Each one pulls a
// collection-bound MqProfileClient out of the shared state.
pub mod health;
pub mod mqprofile;

pub use health::{health, root};
