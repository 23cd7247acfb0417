pub mod forward;
pub mod problem;

pub use forward::{ForwardResponse, ResponseType, simulate_forward};
pub use problem::Mt1dProblem;
