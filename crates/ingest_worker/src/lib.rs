pub mod ingest_worker;
pub mod nats;
