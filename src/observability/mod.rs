/// Observability: operator-facing audit trail
pub mod audit;
