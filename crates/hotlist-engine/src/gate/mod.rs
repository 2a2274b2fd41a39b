pub mod decision;
pub mod route_gate;
pub mod router;
