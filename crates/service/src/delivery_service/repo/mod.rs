pub mod seaorm;

pub use seaorm::SeaOrmDeliveryServiceRepository;
