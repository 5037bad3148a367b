pub mod ndjson;

pub use ndjson::{ParseError, ParsedRecord, RecordParser};
