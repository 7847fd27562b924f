pub mod acquisition;
pub mod assessment;
pub mod config;
pub mod db;
pub mod inference;
pub mod orchestrator;
pub mod routes;
pub mod storage;
pub mod weights;
