// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV decoding with encoding/separator detection

mod csv_parser;

pub use csv_parser::CsvParser;
