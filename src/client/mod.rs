pub mod kafka;

pub use kafka::{ClientError, KafkaClient, ProduceReport, RecordSink, WatermarkSource};
