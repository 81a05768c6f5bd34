//! Test fixtures and mock counterparties

pub mod mock_acceptor;
pub mod run_fixture;

pub use mock_acceptor::{AcceptorBehaviour, MockAcceptor};
pub use run_fixture::RunFixture;
