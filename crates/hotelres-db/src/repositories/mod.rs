//! Repository implementations
//!
//! Concrete implementations of the record store traits defined in
//! hotelres-core, using sqlx for PostgreSQL access.

pub mod capacity_repo;
pub mod reservation_repo;

pub use capacity_repo::PgCapacityRepository;
pub use reservation_repo::PgReservationRepository;
