mod tev;

pub use tev::TevSink;
