pub mod operation_reader;
pub mod summary_writer;
