// Verifiers are split by the kind of mutation they wait on.
pub mod balancer;
pub mod relocate;
pub mod split;
pub mod state;

pub use balancer::BalancerToggle;
pub use relocate::MoveVerifier;
pub use split::SplitVerifier;
pub use state::StateVerifier;
