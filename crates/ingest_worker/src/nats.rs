mod reading_processor;

pub use reading_processor::create_reading_processor;
